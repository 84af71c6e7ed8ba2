//! Performance counters
//!
//! Every framebuffer carries one set of frame-global counters for the setup
//! stages and one set of per-tile counters for the rasterization stages.
//! Counters are plain tick totals; time spent inside a nested stage is
//! billed to that stage's counter, not to the enclosing one.

use std::time::Instant;

/// Ticks per second of the counter clock.
pub const PERFCOUNTER_FREQUENCY: u64 = 1_000_000_000;

/// Frame-global counters, covering triangle setup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FramePerfCounters {
    /// Near/far homogeneous clipping.
    pub clipping: u64,
    /// Viewport transform, bounding box and small/large classification.
    pub common_setup: u64,
    /// Small triangle setup and binning.
    pub smalltri_setup: u64,
    /// Large triangle setup and the per-tile accept/reject walk.
    pub largetri_setup: u64,
}

impl FramePerfCounters {
    /// Counter names, in the order of [`FramePerfCounters::values`].
    pub const NAMES: [&'static str; 4] =
        ["clipping", "common_setup", "smalltri_setup", "largetri_setup"];

    pub fn values(&self) -> [u64; 4] {
        [
            self.clipping,
            self.common_setup,
            self.smalltri_setup,
            self.largetri_setup,
        ]
    }

    pub fn reset(&mut self) {
        *self = FramePerfCounters::default();
    }
}

/// Per-tile counters, covering command buffer traffic and rasterization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TilePerfCounters {
    pub smalltri_tile_raster: u64,
    pub smalltri_coarse_raster: u64,
    pub largetri_tile_raster: u64,
    pub largetri_coarse_raster: u64,
    pub cmdbuf_pushcmd: u64,
    pub cmdbuf_resolve: u64,
    pub clear: u64,
}

impl TilePerfCounters {
    /// Counter names, in the order of [`TilePerfCounters::values`].
    pub const NAMES: [&'static str; 7] = [
        "smalltri_tile_raster",
        "smalltri_coarse_raster",
        "largetri_tile_raster",
        "largetri_coarse_raster",
        "cmdbuf_pushcmd",
        "cmdbuf_resolve",
        "clear",
    ];

    pub fn values(&self) -> [u64; 7] {
        [
            self.smalltri_tile_raster,
            self.smalltri_coarse_raster,
            self.largetri_tile_raster,
            self.largetri_coarse_raster,
            self.cmdbuf_pushcmd,
            self.cmdbuf_resolve,
            self.clear,
        ]
    }

    pub fn reset(&mut self) {
        *self = TilePerfCounters::default();
    }
}

/// Monotonic tick source, one per framebuffer. Ticks are nanoseconds since
/// the framebuffer was created.
#[derive(Debug, Clone, Copy)]
pub struct TickSource {
    epoch: Instant,
}

impl TickSource {
    pub fn new() -> TickSource {
        TickSource {
            epoch: Instant::now(),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

impl Default for TickSource {
    fn default() -> TickSource {
        TickSource::new()
    }
}
