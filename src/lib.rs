//! Tiled software rasterizer
//!
//! This crate implements a Pineda-style CPU rasterizer in the spirit of the
//! Larrabee rasterization work: triangle setup bins work into per-tile
//! command rings, and each tile rasterizes its commands hierarchically
//! (tile, then 16x16 coarse block, then pixel) with trivial accept/reject
//! tests on the edge equations. See "A Parallel Algorithm for Polygon
//! Rasterization" (Pineda, SIGGRAPH '88) and Abrash's "Rasterization on
//! Larrabee".
//!
//! All triangle math is fixed point: clip space coordinates are s15.16,
//! window coordinates are s16.8 ([`fixed`]). The framebuffer stores pixels
//! Morton-swizzled inside 128x128 tiles ([`bits`], [`Framebuffer`]); the
//! [`Framebuffer::pack_row_major`] readback converts back to plain
//! row-major images.
//!
//! # Drawing
//!
//! The whole pipeline hangs off [`Framebuffer`]: push clip-space triangles
//! with [`Framebuffer::draw`] or [`Framebuffer::draw_indexed`], force the
//! queued tile work through with [`Framebuffer::resolve`], then read the
//! result back:
//!
//!     use swrast::{Attachment, Framebuffer, PixelFormat};
//!
//!     let mut fb = Framebuffer::new(256, 256);
//!     fb.clear(0xFF00_0000);
//!
//!     // one triangle: three (x, y, z, w) vertices in s15.16 clip space
//!     let verts = [
//!         -65536, 65536, 0, 65536,
//!         65536, 65536, 0, 65536,
//!         -65536, -65536, 0, 65536,
//!     ];
//!     fb.draw(&verts);
//!     fb.resolve();
//!
//!     let mut image = vec![0u8; 256 * 256 * 4];
//!     fb.pack_row_major(Attachment::Color0, 0, 0, 256, 256,
//!                       PixelFormat::Rgba8Unorm, &mut image);
//!
//! Covered pixels are shaded from the interpolated (non perspective
//! correct) barycentrics, with full alpha.

pub mod bits;
pub mod cmdbuf;
pub mod fixed;
pub mod framebuffer;
pub mod perf;
pub mod ppm;

mod raster;
mod setup;

pub use crate::framebuffer::{Attachment, Framebuffer, PixelFormat};
pub use crate::perf::{FramePerfCounters, TilePerfCounters, PERFCOUNTER_FREQUENCY};

// Tile sizing follows the Larrabee description: any edge equation that is
// not trivially accepted or rejected at the tile level fits in 32 bits
// inside a 128x128 tile.

/// Width and height of a tile, in pixels. Tiles are the binning granularity
/// and the storage unit of the framebuffer.
pub const TILE_WIDTH_IN_PIXELS: i32 = 128;

/// Width and height of a coarse rasterization block, in pixels.
pub const COARSE_BLOCK_WIDTH_IN_PIXELS: i32 = 16;

/// Width and height of a fine rasterization block, in pixels. Fine blocks
/// are the natural SIMD granularity of the inner loops; they are not a
/// storage boundary.
pub const FINE_BLOCK_WIDTH_IN_PIXELS: i32 = 4;

/// Pixels in one tile.
pub const PIXELS_PER_TILE: i32 = TILE_WIDTH_IN_PIXELS * TILE_WIDTH_IN_PIXELS;

/// Coarse blocks along one side of a tile.
pub const TILE_WIDTH_IN_COARSE_BLOCKS: i32 =
    TILE_WIDTH_IN_PIXELS / COARSE_BLOCK_WIDTH_IN_PIXELS;

// The swizzle masks use the alternating yxyxyx bit pattern that makes
// pixels Morton-ordered within every rasterization level of a tile.
// The tiles themselves are stored row major.

/// Bits of a tile-local pixel index fed by the x coordinate.
pub const TILE_X_SWIZZLE_MASK: u32 = 0x5555_5555 & (PIXELS_PER_TILE as u32 - 1);

/// Bits of a tile-local pixel index fed by the y coordinate.
pub const TILE_Y_SWIZZLE_MASK: u32 = 0xAAAA_AAAA & (PIXELS_PER_TILE as u32 - 1);

/// Capacity of each tile's command ring, in u32 words. A push that does not
/// fit forces the tile to resolve first.
pub const TILE_CMDBUF_SIZE_IN_DWORDS: usize = 128;
