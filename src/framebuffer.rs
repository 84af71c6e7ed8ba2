//! Hierarchically tiled framebuffer
//!
//! The framebuffer owns every allocation of the rasterizer: the swizzled
//! color and depth planes, the pool of per-tile command rings, and the
//! performance counters. The image is partitioned into 128x128 tiles,
//! stored row major; within a tile pixels are Morton-interleaved via the
//! swizzle masks, so the tile-local index of a pixel is
//! `pdep(x, x_mask) | pdep(y, y_mask)`.
//!
//! Triangle setup pushes commands into tile rings; `resolve` (or an inline
//! flush when a ring fills up) drains them into the planes. The
//! `pack_row_major` readback undoes the swizzle and converts to a caller
//! visible pixel format.

use std::cmp::{max, min};

use crate::bits::pdep_u32;
use crate::cmdbuf::{
    ClearTileCmd, DrawSmallTriCmd, DrawTileCmd, TileCmdBuf, CLEARTILE_SIZE_IN_DWORDS,
    DRAWSMALLTRI_SIZE_IN_DWORDS, TILECMD_ID_CLEARTILE, TILECMD_ID_DRAWSMALLTRI,
    TILECMD_ID_DRAWTILE_0EDGE, TILECMD_ID_DRAWTILE_3EDGE, TILECMD_ID_RESETBUF,
};
use crate::perf::{FramePerfCounters, TickSource, TilePerfCounters, PERFCOUNTER_FREQUENCY};
use crate::{
    PIXELS_PER_TILE, TILE_CMDBUF_SIZE_IN_DWORDS, TILE_WIDTH_IN_PIXELS, TILE_X_SWIZZLE_MASK,
    TILE_Y_SWIZZLE_MASK,
};

/// Attachment selector for [`Framebuffer::pack_row_major`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Color0,
    Depth,
}

/// Destination pixel format for [`Framebuffer::pack_row_major`].
///
/// The color plane holds 32 bit ARGB pixels (alpha in the high byte); the
/// two color formats are byte orderings of that pixel. `R32Unorm` is the
/// raw 32 bit depth value, little endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    R32Unorm,
}

/// The rasterizer's render target and work queue, created with
/// [`Framebuffer::new`].
#[derive(Debug)]
pub struct Framebuffer {
    pub(crate) backbuffer: Vec<u32>,
    pub(crate) depthbuffer: Vec<u32>,

    tile_cmdpool: Vec<u32>,
    tile_cmdbufs: Vec<TileCmdBuf>,

    pub(crate) width_in_pixels: i32,
    pub(crate) height_in_pixels: i32,

    pub(crate) width_in_tiles: i32,
    pub(crate) height_in_tiles: i32,
    pub(crate) total_num_tiles: i32,

    // width_in_tiles * pixels_per_tile
    pub(crate) pixels_per_row_of_tiles: i32,
    // pixels_per_row_of_tiles * height_in_tiles
    pub(crate) pixels_per_slice: i32,

    pub(crate) clock: TickSource,
    pub(crate) perfcounters: FramePerfCounters,
    pub(crate) tile_perfcounters: Vec<TilePerfCounters>,
}

impl Framebuffer {
    /// Create a framebuffer of `width` x `height` pixels.
    ///
    /// Dimensions are padded up to whole tiles internally, so binning never
    /// produces an out of bounds tile; the padding is invisible to
    /// `pack_row_major`. Panics unless `0 < width, height < 16384` — the
    /// precision limit of the 2D cross product of two s16.8 coordinates.
    pub fn new(width: i32, height: i32) -> Framebuffer {
        assert!(width > 0 && width < 16384, "width out of range: {}", width);
        assert!(
            height > 0 && height < 16384,
            "height out of range: {}",
            height
        );

        let padded_width = (width + (TILE_WIDTH_IN_PIXELS - 1)) & !(TILE_WIDTH_IN_PIXELS - 1);
        let padded_height = (height + (TILE_WIDTH_IN_PIXELS - 1)) & !(TILE_WIDTH_IN_PIXELS - 1);

        let width_in_tiles = padded_width / TILE_WIDTH_IN_PIXELS;
        let height_in_tiles = padded_height / TILE_WIDTH_IN_PIXELS;
        let total_num_tiles = width_in_tiles * height_in_tiles;

        let pixels_per_row_of_tiles = padded_width * TILE_WIDTH_IN_PIXELS;
        let pixels_per_slice = padded_height / TILE_WIDTH_IN_PIXELS * pixels_per_row_of_tiles;

        // command rings are circular queues, initially empty
        let tile_cmdbufs = (0..total_num_tiles as usize)
            .map(|i| TileCmdBuf::new(i * TILE_CMDBUF_SIZE_IN_DWORDS, TILE_CMDBUF_SIZE_IN_DWORDS))
            .collect();

        log::debug!(
            "new framebuffer: {}x{} pixels, {}x{} tiles",
            width,
            height,
            width_in_tiles,
            height_in_tiles
        );

        Framebuffer {
            // color clears to transparent black, depth to infinity
            backbuffer: vec![0u32; pixels_per_slice as usize],
            depthbuffer: vec![0xFFFF_FFFFu32; pixels_per_slice as usize],
            tile_cmdpool: vec![0u32; total_num_tiles as usize * TILE_CMDBUF_SIZE_IN_DWORDS],
            tile_cmdbufs,
            width_in_pixels: width,
            height_in_pixels: height,
            width_in_tiles,
            height_in_tiles,
            total_num_tiles,
            pixels_per_row_of_tiles,
            pixels_per_slice,
            clock: TickSource::new(),
            perfcounters: FramePerfCounters::default(),
            tile_perfcounters: vec![TilePerfCounters::default(); total_num_tiles as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width_in_pixels
    }

    pub fn height(&self) -> i32 {
        self.height_in_pixels
    }

    pub fn width_in_tiles(&self) -> i32 {
        self.width_in_tiles
    }

    pub fn height_in_tiles(&self) -> i32 {
        self.height_in_tiles
    }

    /// Number of tiles in the padded framebuffer; this is the length of
    /// [`Framebuffer::tile_perfcounters`].
    pub fn total_num_tiles(&self) -> i32 {
        self.total_num_tiles
    }

    /// Queue a clear of the whole framebuffer: color to `color` (ARGB),
    /// depth to `0xFFFFFFFF`. Takes effect at the next resolve.
    pub fn clear(&mut self, color: u32) {
        let words = ClearTileCmd { color }.encode();
        for tile_id in 0..self.total_num_tiles as usize {
            self.push_tilecmd(tile_id, &words);
        }
    }

    /// Drain every tile's command ring. Afterwards the backbuffer reflects
    /// all queued work and every ring is empty. Idempotent on empty rings.
    pub fn resolve(&mut self) {
        for tile_id in 0..self.total_num_tiles as usize {
            self.resolve_tile(tile_id);
        }
    }

    /// Interpret and consume all commands queued for one tile.
    pub(crate) fn resolve_tile(&mut self, tile_id: usize) {
        let mut t0 = self.clock.ticks();

        let TileCmdBuf { start, end, write, .. } = self.tile_cmdbufs[tile_id];
        let mut cmd = self.tile_cmdbufs[tile_id].read;

        while cmd != write {
            let opcode = self.tile_cmdpool[cmd];

            if opcode == TILECMD_ID_RESETBUF {
                cmd = start;
            } else if opcode == TILECMD_ID_DRAWSMALLTRI {
                let drawcmd = DrawSmallTriCmd::decode(
                    &self.tile_cmdpool[cmd..cmd + DRAWSMALLTRI_SIZE_IN_DWORDS],
                );
                self.tile_perfcounters[tile_id].cmdbuf_resolve += self.clock.ticks() - t0;
                self.draw_tile_smalltri(tile_id, &drawcmd);
                t0 = self.clock.ticks();

                cmd += DRAWSMALLTRI_SIZE_IN_DWORDS;
            } else if opcode >= TILECMD_ID_DRAWTILE_0EDGE && opcode <= TILECMD_ID_DRAWTILE_3EDGE {
                let num_dwords = DrawTileCmd::size_in_dwords(
                    (opcode - TILECMD_ID_DRAWTILE_0EDGE) as usize,
                );
                let drawcmd = DrawTileCmd::decode(&self.tile_cmdpool[cmd..cmd + num_dwords]);
                self.tile_perfcounters[tile_id].cmdbuf_resolve += self.clock.ticks() - t0;
                self.draw_tile_largetri(tile_id, &drawcmd);
                t0 = self.clock.ticks();

                cmd += num_dwords;
            } else if opcode == TILECMD_ID_CLEARTILE {
                let clearcmd =
                    ClearTileCmd::decode(&self.tile_cmdpool[cmd..cmd + CLEARTILE_SIZE_IN_DWORDS]);
                self.tile_perfcounters[tile_id].cmdbuf_resolve += self.clock.ticks() - t0;
                self.clear_tile(tile_id, clearcmd.color);
                t0 = self.clock.ticks();

                cmd += CLEARTILE_SIZE_IN_DWORDS;
            } else {
                panic!("unknown tile command: {}", opcode);
            }

            if cmd == end {
                cmd = start;
                if write == end {
                    break;
                }
            }
        }

        // the read pointer never rests at the end after interpreting
        assert!(cmd != end);
        self.tile_cmdbufs[tile_id].read = cmd;

        self.tile_perfcounters[tile_id].cmdbuf_resolve += self.clock.ticks() - t0;
    }

    /// Append an encoded command to a tile's ring, resolving the tile
    /// inline whenever the ring would otherwise overflow.
    pub(crate) fn push_tilecmd(&mut self, tile_id: usize, words: &[u32]) {
        assert!(tile_id < self.total_num_tiles as usize);
        let num_dwords = words.len();

        let mut t0 = self.clock.ticks();

        // the read pointer never rests at the end
        assert!(self.tile_cmdbufs[tile_id].read != self.tile_cmdbufs[tile_id].end);

        let buf = self.tile_cmdbufs[tile_id];
        if buf.read > buf.write && buf.read - buf.write < num_dwords + 1 {
            // the read pointer is ahead of the write pointer without enough
            // room in between; flush so read catches up to write from
            // behind. write is never allowed to catch read, hence the +1.
            log::trace!("tile {}: ring pressure, inline resolve", tile_id);
            self.tile_perfcounters[tile_id].cmdbuf_pushcmd += self.clock.ticks() - t0;
            self.resolve_tile(tile_id);
            t0 = self.clock.ticks();

            debug_assert!(self.tile_cmdbufs[tile_id].is_empty());
        }

        // the read head is out of the way, but the span left before the end
        // of the ring may still be too short
        let buf = self.tile_cmdbufs[tile_id];
        if buf.end - buf.write < num_dwords {
            // write always wraps at the end of this function
            debug_assert!(buf.write != buf.end);

            // abandon the slop at the end of the ring
            self.tile_cmdpool[buf.write] = TILECMD_ID_RESETBUF;

            if buf.read == buf.start {
                // write is not allowed to catch up to read, so make read
                // catch up to write instead
                log::trace!("tile {}: ring wrap over read, inline resolve", tile_id);
                self.tile_perfcounters[tile_id].cmdbuf_pushcmd += self.clock.ticks() - t0;
                self.resolve_tile(tile_id);
                t0 = self.clock.ticks();

                // read stopped at the old write position; both wrap to the
                // start together
                self.tile_cmdbufs[tile_id].read = buf.start;
            }

            self.tile_cmdbufs[tile_id].write = buf.start;

            // after wrapping, the read head can be in the way again
            let buf = self.tile_cmdbufs[tile_id];
            if buf.read > buf.write && buf.read - buf.write < num_dwords + 1 {
                self.tile_perfcounters[tile_id].cmdbuf_pushcmd += self.clock.ticks() - t0;
                self.resolve_tile(tile_id);
                t0 = self.clock.ticks();

                debug_assert!(self.tile_cmdbufs[tile_id].is_empty());
            }
        }

        let buf = self.tile_cmdbufs[tile_id];
        debug_assert!(buf.end - buf.write >= num_dwords);
        debug_assert!(buf.read <= buf.write || buf.read - buf.write >= num_dwords + 1);

        self.tile_cmdpool[buf.write..buf.write + num_dwords].copy_from_slice(words);
        self.tile_cmdbufs[tile_id].write += num_dwords;

        // write is not allowed to catch up to read
        assert!(self.tile_cmdbufs[tile_id].write != self.tile_cmdbufs[tile_id].read);

        // wrap the write pointer if it reached the end
        if self.tile_cmdbufs[tile_id].write == buf.end {
            if self.tile_cmdbufs[tile_id].read == buf.start {
                // the whole ring gets consumed in one go: read wraps to the
                // start and write follows it there
                self.tile_perfcounters[tile_id].cmdbuf_pushcmd += self.clock.ticks() - t0;
                self.resolve_tile(tile_id);
                t0 = self.clock.ticks();
            }

            self.tile_cmdbufs[tile_id].write = buf.start;
        }

        self.tile_perfcounters[tile_id].cmdbuf_pushcmd += self.clock.ticks() - t0;
    }

    /// Copy a rectangle of an attachment into `data`, row major, in the
    /// requested pixel format.
    ///
    /// Panics if the rectangle escapes the framebuffer, if `data` is
    /// shorter than `width * height * 4` bytes, or if the format does not
    /// apply to the attachment.
    pub fn pack_row_major(
        &self,
        attachment: Attachment,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: PixelFormat,
        data: &mut [u8],
    ) {
        assert!(x >= 0 && x < self.width_in_pixels);
        assert!(y >= 0 && y < self.height_in_pixels);
        assert!(width >= 0 && width <= self.width_in_pixels);
        assert!(height >= 0 && height <= self.height_in_pixels);
        assert!(x + width <= self.width_in_pixels, "rectangle escapes framebuffer");
        assert!(y + height <= self.height_in_pixels, "rectangle escapes framebuffer");
        assert!(data.len() >= width as usize * height as usize * 4);
        match (attachment, format) {
            (Attachment::Color0, PixelFormat::R32Unorm) => {
                panic!("r32_unorm is not a color format")
            }
            (Attachment::Depth, PixelFormat::Rgba8Unorm)
            | (Attachment::Depth, PixelFormat::Bgra8Unorm) => {
                panic!("depth packs only as r32_unorm")
            }
            _ => {}
        }

        let topleft_tile_y = y / TILE_WIDTH_IN_PIXELS;
        let topleft_tile_x = x / TILE_WIDTH_IN_PIXELS;
        let bottomright_tile_y = (y + (height - 1)) / TILE_WIDTH_IN_PIXELS;
        let bottomright_tile_x = (x + (width - 1)) / TILE_WIDTH_IN_PIXELS;

        let mut curr_tile_row_start =
            topleft_tile_y * self.pixels_per_row_of_tiles + topleft_tile_x * PIXELS_PER_TILE;

        for tile_y in topleft_tile_y..=bottomright_tile_y {
            let mut curr_tile_start = curr_tile_row_start;

            for tile_x in topleft_tile_x..=bottomright_tile_x {
                let topleft_y = tile_y * TILE_WIDTH_IN_PIXELS;
                let topleft_x = tile_x * TILE_WIDTH_IN_PIXELS;
                let bottomright_y = topleft_y + TILE_WIDTH_IN_PIXELS;
                let bottomright_x = topleft_x + TILE_WIDTH_IN_PIXELS;

                // the rectangle clipped to this tile
                let pixel_y_min = max(topleft_y, y);
                let pixel_x_min = max(topleft_x, x);
                let pixel_y_max = min(bottomright_y, y + height);
                let pixel_x_max = min(bottomright_x, x + width);

                let mut pixel_y_bits = pdep_u32(pixel_y_min as u32, TILE_Y_SWIZZLE_MASK);
                for pixel_y in pixel_y_min..pixel_y_max {
                    let mut pixel_x_bits = pdep_u32(pixel_x_min as u32, TILE_X_SWIZZLE_MASK);
                    for pixel_x in pixel_x_min..pixel_x_max {
                        let rel_pixel_y = pixel_y - y;
                        let rel_pixel_x = pixel_x - x;
                        let dst_i = (rel_pixel_y * width + rel_pixel_x) as usize;
                        let src_i =
                            curr_tile_start as usize + (pixel_y_bits | pixel_x_bits) as usize;

                        match attachment {
                            Attachment::Color0 => {
                                let src = self.backbuffer[src_i];
                                let dst = &mut data[dst_i * 4..dst_i * 4 + 4];
                                match format {
                                    PixelFormat::Rgba8Unorm => {
                                        dst[0] = (src >> 16) as u8;
                                        dst[1] = (src >> 8) as u8;
                                        dst[2] = src as u8;
                                        dst[3] = (src >> 24) as u8;
                                    }
                                    PixelFormat::Bgra8Unorm => {
                                        dst[0] = src as u8;
                                        dst[1] = (src >> 8) as u8;
                                        dst[2] = (src >> 16) as u8;
                                        dst[3] = (src >> 24) as u8;
                                    }
                                    PixelFormat::R32Unorm => unreachable!(),
                                }
                            }
                            Attachment::Depth => {
                                let src = self.depthbuffer[src_i];
                                data[dst_i * 4..dst_i * 4 + 4]
                                    .copy_from_slice(&src.to_le_bytes());
                            }
                        }

                        pixel_x_bits =
                            pixel_x_bits.wrapping_sub(TILE_X_SWIZZLE_MASK) & TILE_X_SWIZZLE_MASK;
                    }
                    pixel_y_bits =
                        pixel_y_bits.wrapping_sub(TILE_Y_SWIZZLE_MASK) & TILE_Y_SWIZZLE_MASK;
                }

                curr_tile_start += PIXELS_PER_TILE;
            }

            curr_tile_row_start += self.pixels_per_row_of_tiles;
        }
    }

    /// Frame-global performance counters.
    pub fn perfcounters(&self) -> FramePerfCounters {
        self.perfcounters
    }

    /// Per-tile performance counters, indexed by tile id (row major over
    /// the tile grid).
    pub fn tile_perfcounters(&self) -> &[TilePerfCounters] {
        &self.tile_perfcounters
    }

    /// Ticks per second of the counter clock.
    pub fn perfcounter_frequency(&self) -> u64 {
        PERFCOUNTER_FREQUENCY
    }

    /// Zero the frame-global and every tile's counters.
    pub fn reset_perfcounters(&mut self) {
        self.perfcounters.reset();
        for tile_pc in &mut self.tile_perfcounters {
            tile_pc.reset();
        }
    }
}
