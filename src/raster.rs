//! Per-tile rasterization
//!
//! Interprets the commands queued in a tile's ring. Small triangles walk
//! only the coarse blocks their bounding box touches; tile-spanning
//! triangles re-classify every coarse block against per-block trivial
//! reject/accept edge offsets before descending to pixels. Pixels are
//! addressed Morton-swizzled: the per-row counters step with
//! `(bits - mask) & mask`, carrying through the held bits.

use crate::bits::pdep_u32;
use crate::cmdbuf::{DrawSmallTriCmd, DrawTileCmd};
use crate::framebuffer::Framebuffer;
use crate::{
    COARSE_BLOCK_WIDTH_IN_PIXELS, PIXELS_PER_TILE, TILE_WIDTH_IN_COARSE_BLOCKS,
    TILE_WIDTH_IN_PIXELS, TILE_X_SWIZZLE_MASK, TILE_Y_SWIZZLE_MASK,
};

impl Framebuffer {
    pub(crate) fn clear_tile(&mut self, tile_id: usize, color: u32) {
        let t0 = self.clock.ticks();

        let tile_start_i = PIXELS_PER_TILE as usize * tile_id;
        let tile_end_i = tile_start_i + PIXELS_PER_TILE as usize;
        for px in tile_start_i..tile_end_i {
            self.backbuffer[px] = color;
            self.depthbuffer[px] = 0xFFFF_FFFF;
        }

        self.tile_perfcounters[tile_id].clear += self.clock.ticks() - t0;
    }

    /// Depth-interpolate, clamp, depth-test and shade one covered pixel.
    ///
    /// `u`, `v`, `w` are the 0.15 barycentrics of vertices 1, 2, 0; the
    /// written color is the barycentrics themselves, full alpha.
    fn shade_pixel(
        &mut self,
        dst_i: usize,
        vert_zs: [i32; 3],
        min_z: u32,
        max_z: u32,
        u: i32,
        v: i32,
        w: i32,
    ) {
        let mut pixel_z = (vert_zs[0].wrapping_shl(15))
            .wrapping_add(u.wrapping_mul(vert_zs[1].wrapping_sub(vert_zs[0])))
            .wrapping_add(v.wrapping_mul(vert_zs[2].wrapping_sub(vert_zs[0])))
            as u32;

        let min_z = min_z.wrapping_shl(15);
        let max_z = max_z.wrapping_shl(15);
        if pixel_z < min_z {
            pixel_z = min_z;
        }
        if pixel_z > max_z {
            pixel_z = max_z;
        }

        if pixel_z < self.depthbuffer[dst_i] {
            self.depthbuffer[dst_i] = pixel_z;
            self.backbuffer[dst_i] = 0xFF00_0000
                | (((w / 0x80) as u32 & 0xFF) << 16)
                | (((u / 0x80) as u32 & 0xFF) << 8)
                | ((v / 0x80) as u32 & 0xFF);
        }
    }

    fn draw_coarse_block_smalltri(
        &mut self,
        tile_id: usize,
        coarse_topleft_x: i32,
        coarse_topleft_y: i32,
        drawcmd: &DrawSmallTriCmd,
    ) {
        let t0 = self.clock.ticks();

        let rcp_triarea2_mantissa = (drawcmd.rcp_triarea2 & 0xFF) as i32;
        let rcp_triarea2_exponent = ((drawcmd.rcp_triarea2 & 0xFF00) >> 8) as i32;
        let rcp_triarea2_rshift = rcp_triarea2_exponent - 127;

        let tile_start_i = PIXELS_PER_TILE as usize * tile_id;

        let mut edges = drawcmd.edges;

        let mut pixel_y_bits = pdep_u32(coarse_topleft_y as u32, TILE_Y_SWIZZLE_MASK);
        for _pixel_y in 0..COARSE_BLOCK_WIDTH_IN_PIXELS {
            let mut edges_row = edges;

            let mut pixel_x_bits = pdep_u32(coarse_topleft_x as u32, TILE_X_SWIZZLE_MASK);
            for _pixel_x in 0..COARSE_BLOCK_WIDTH_IN_PIXELS {
                let dst_i = tile_start_i + (pixel_y_bits | pixel_x_bits) as usize;

                // TODO: rasterize whole fine blocks at a time rather than
                // pixels at a time
                if edges_row[0] < 0 && edges_row[1] < 0 && edges_row[2] < 0 {
                    let (shifted_e2, shifted_e0) = if rcp_triarea2_rshift < 0 {
                        (
                            (-edges_row[2]) << -rcp_triarea2_rshift,
                            (-edges_row[0]) << -rcp_triarea2_rshift,
                        )
                    } else {
                        (
                            (-edges_row[2]) >> rcp_triarea2_rshift,
                            (-edges_row[0]) >> rcp_triarea2_rshift,
                        )
                    };

                    // non perspective correct barycentrics for vertices 1 and 2
                    let u = (shifted_e2 * rcp_triarea2_mantissa) >> 1;
                    let v = (shifted_e0 * rcp_triarea2_mantissa) >> 1;
                    debug_assert!(u < 0x8000);
                    debug_assert!(v < 0x8000);

                    // third barycentric; unrelated to the vertex w component
                    let w = 0x7FFF - u - v;

                    self.shade_pixel(dst_i, drawcmd.vert_zs, drawcmd.min_z, drawcmd.max_z, u, v, w);
                }

                for e in 0..3 {
                    edges_row[e] += drawcmd.edge_dxs[e];
                }
                pixel_x_bits =
                    pixel_x_bits.wrapping_sub(TILE_X_SWIZZLE_MASK) & TILE_X_SWIZZLE_MASK;
            }

            for e in 0..3 {
                edges[e] += drawcmd.edge_dys[e];
            }
            pixel_y_bits = pixel_y_bits.wrapping_sub(TILE_Y_SWIZZLE_MASK) & TILE_Y_SWIZZLE_MASK;
        }

        self.tile_perfcounters[tile_id].smalltri_coarse_raster += self.clock.ticks() - t0;
    }

    pub(crate) fn draw_tile_smalltri(&mut self, tile_id: usize, drawcmd: &DrawSmallTriCmd) {
        let mut t0 = self.clock.ticks();

        let mut coarse_edge_dxs = [0i32; 3];
        let mut coarse_edge_dys = [0i32; 3];
        for v in 0..3 {
            coarse_edge_dxs[v] = drawcmd.edge_dxs[v] * COARSE_BLOCK_WIDTH_IN_PIXELS;
            coarse_edge_dys[v] = drawcmd.edge_dys[v] * COARSE_BLOCK_WIDTH_IN_PIXELS;
        }

        // step the edges from the tile origin to the first coarse block
        let mut edges = [0i32; 3];
        for v in 0..3 {
            edges[v] = drawcmd.edges[v]
                + drawcmd.first_coarse_x * coarse_edge_dxs[v]
                + drawcmd.first_coarse_y * coarse_edge_dys[v];
        }

        let tile_y = tile_id as i32 / self.width_in_tiles;
        let tile_x = tile_id as i32 - tile_y * self.width_in_tiles;

        for cb_y in drawcmd.first_coarse_y..=drawcmd.last_coarse_y {
            let mut row_edges = edges;

            for cb_x in drawcmd.first_coarse_x..=drawcmd.last_coarse_x {
                let mut cbargs = *drawcmd;
                cbargs.edges = row_edges;

                let coarse_topleft_x =
                    tile_x * TILE_WIDTH_IN_PIXELS + cb_x * COARSE_BLOCK_WIDTH_IN_PIXELS;
                let coarse_topleft_y =
                    tile_y * TILE_WIDTH_IN_PIXELS + cb_y * COARSE_BLOCK_WIDTH_IN_PIXELS;

                self.tile_perfcounters[tile_id].smalltri_tile_raster += self.clock.ticks() - t0;
                self.draw_coarse_block_smalltri(tile_id, coarse_topleft_x, coarse_topleft_y, &cbargs);
                t0 = self.clock.ticks();

                for v in 0..3 {
                    row_edges[v] += coarse_edge_dxs[v];
                }
            }

            for v in 0..3 {
                edges[v] += coarse_edge_dys[v];
            }
        }

        self.tile_perfcounters[tile_id].smalltri_tile_raster += self.clock.ticks() - t0;
    }

    fn draw_coarse_block_largetri(
        &mut self,
        tile_id: usize,
        coarse_topleft_x: i32,
        coarse_topleft_y: i32,
        drawcmd: &DrawTileCmd,
    ) {
        let t0 = self.clock.ticks();

        let num_test_edges = drawcmd.num_test_edges;

        let rcp_triarea2_mantissa = i64::from(drawcmd.rcp_triarea2 & 0xFFFF);
        let rcp_triarea2_exponent = ((drawcmd.rcp_triarea2 & 0xFF_0000) >> 16) as i32;
        let rcp_triarea2_rshift = rcp_triarea2_exponent - 127;

        let tile_start_i = PIXELS_PER_TILE as usize * tile_id;

        let mut edges = [0i32; 3];
        edges[..num_test_edges].copy_from_slice(&drawcmd.edges[..num_test_edges]);

        let mut pixel_y_bits = pdep_u32(coarse_topleft_y as u32, TILE_Y_SWIZZLE_MASK);
        for _pixel_y in 0..COARSE_BLOCK_WIDTH_IN_PIXELS {
            let mut edges_row = edges;

            let mut pixel_x_bits = pdep_u32(coarse_topleft_x as u32, TILE_X_SWIZZLE_MASK);
            for _pixel_x in 0..COARSE_BLOCK_WIDTH_IN_PIXELS {
                let dst_i = tile_start_i + (pixel_y_bits | pixel_x_bits) as usize;

                let mut pixel_discarded = false;
                for e in 0..num_test_edges {
                    if edges_row[e] >= 0 {
                        pixel_discarded = true;
                        break;
                    }
                }

                if !pixel_discarded {
                    let shift = |e: i32| -> i64 {
                        if rcp_triarea2_rshift < 0 {
                            i64::from(e) << -rcp_triarea2_rshift
                        } else {
                            i64::from(e) >> rcp_triarea2_rshift
                        }
                    };

                    // barycentrics only exist for edges the command carries;
                    // a trivially accepted edge contributes zero
                    let u = if num_test_edges < 3 {
                        0
                    } else {
                        ((shift(-edges_row[2]) * rcp_triarea2_mantissa) >> 16 >> 1) as i32
                    };
                    let v = if num_test_edges < 1 {
                        0
                    } else {
                        ((shift(-edges_row[0]) * rcp_triarea2_mantissa) >> 16 >> 1) as i32
                    };
                    debug_assert!(u < 0x8000);
                    debug_assert!(v < 0x8000);

                    let w = 0x7FFF - u - v;

                    self.shade_pixel(dst_i, drawcmd.vert_zs, drawcmd.min_z, drawcmd.max_z, u, v, w);
                }

                for e in 0..num_test_edges {
                    edges_row[e] += drawcmd.edge_dxs[e];
                }
                pixel_x_bits =
                    pixel_x_bits.wrapping_sub(TILE_X_SWIZZLE_MASK) & TILE_X_SWIZZLE_MASK;
            }

            for e in 0..num_test_edges {
                edges[e] += drawcmd.edge_dys[e];
            }
            pixel_y_bits = pixel_y_bits.wrapping_sub(TILE_Y_SWIZZLE_MASK) & TILE_Y_SWIZZLE_MASK;
        }

        self.tile_perfcounters[tile_id].largetri_coarse_raster += self.clock.ticks() - t0;
    }

    pub(crate) fn draw_tile_largetri(&mut self, tile_id: usize, drawcmd: &DrawTileCmd) {
        let mut t0 = self.clock.ticks();

        let num_test_edges = drawcmd.num_test_edges;

        let mut coarse_edge_dxs = [0i32; 3];
        let mut coarse_edge_dys = [0i32; 3];
        for v in 0..num_test_edges {
            coarse_edge_dxs[v] = drawcmd.edge_dxs[v] * COARSE_BLOCK_WIDTH_IN_PIXELS;
            coarse_edge_dys[v] = drawcmd.edge_dys[v] * COARSE_BLOCK_WIDTH_IN_PIXELS;
        }

        let mut edges = [0i32; 3];
        edges[..num_test_edges].copy_from_slice(&drawcmd.edges[..num_test_edges]);

        // per coarse block trivial reject and accept corner offsets
        let mut edge_triv_rejs = [0i32; 3];
        let mut edge_triv_accs = [0i32; 3];
        for v in 0..num_test_edges {
            edge_triv_rejs[v] = drawcmd.edges[v];
            edge_triv_accs[v] = drawcmd.edges[v];
            if coarse_edge_dxs[v] < 0 {
                edge_triv_rejs[v] += coarse_edge_dxs[v];
            }
            if coarse_edge_dxs[v] > 0 {
                edge_triv_accs[v] += coarse_edge_dxs[v];
            }
            if coarse_edge_dys[v] < 0 {
                edge_triv_rejs[v] += coarse_edge_dys[v];
            }
            if coarse_edge_dys[v] > 0 {
                edge_triv_accs[v] += coarse_edge_dys[v];
            }
        }

        let tile_y = tile_id as i32 / self.width_in_tiles;
        let tile_x = tile_id as i32 - tile_y * self.width_in_tiles;

        for cb_y in 0..TILE_WIDTH_IN_COARSE_BLOCKS {
            let mut row_edges = edges;
            let mut edge_row_triv_rejs = edge_triv_rejs;
            let mut edge_row_triv_accs = edge_triv_accs;

            for cb_x in 0..TILE_WIDTH_IN_COARSE_BLOCKS {
                // trivial reject if at least one edge misses the whole block
                let mut trivially_rejected = false;
                for v in 0..num_test_edges {
                    if edge_row_triv_rejs[v] >= 0 {
                        trivially_rejected = true;
                        break;
                    }
                }

                if !trivially_rejected {
                    let mut edge_needs_test = [false; 3];
                    let mut num_tests_necessary = 0;
                    for v in 0..num_test_edges {
                        if edge_row_triv_accs[v] >= 0 {
                            edge_needs_test[v] = true;
                            num_tests_necessary += 1;
                        }
                    }

                    // rotate the surviving edges (and their vertices' z)
                    // into the low slots
                    let mut vertex_rotation = 0;
                    if num_tests_necessary == 1 {
                        if edge_needs_test[1] {
                            vertex_rotation = 1;
                        } else if edge_needs_test[2] {
                            vertex_rotation = 2;
                        }
                    } else if num_tests_necessary == 2 {
                        if !edge_needs_test[0] {
                            vertex_rotation = 1;
                        } else if !edge_needs_test[1] {
                            vertex_rotation = 2;
                        }
                    }

                    let mut cbargs = DrawTileCmd {
                        num_test_edges: num_tests_necessary,
                        ..*drawcmd
                    };
                    for v in 0..3 {
                        let rotated_v = (v + vertex_rotation) % 3;
                        cbargs.edges[v] = row_edges[rotated_v];
                        cbargs.edge_dxs[v] = drawcmd.edge_dxs[rotated_v];
                        cbargs.edge_dys[v] = drawcmd.edge_dys[rotated_v];
                        cbargs.vert_zs[v] = drawcmd.vert_zs[rotated_v];
                    }

                    let coarse_topleft_x =
                        tile_x * TILE_WIDTH_IN_PIXELS + cb_x * COARSE_BLOCK_WIDTH_IN_PIXELS;
                    let coarse_topleft_y =
                        tile_y * TILE_WIDTH_IN_PIXELS + cb_y * COARSE_BLOCK_WIDTH_IN_PIXELS;

                    self.tile_perfcounters[tile_id].largetri_tile_raster +=
                        self.clock.ticks() - t0;
                    self.draw_coarse_block_largetri(
                        tile_id,
                        coarse_topleft_x,
                        coarse_topleft_y,
                        &cbargs,
                    );
                    t0 = self.clock.ticks();
                }

                for v in 0..num_test_edges {
                    row_edges[v] += coarse_edge_dxs[v];
                    edge_row_triv_rejs[v] += coarse_edge_dxs[v];
                    edge_row_triv_accs[v] += coarse_edge_dxs[v];
                }
            }

            for v in 0..num_test_edges {
                edges[v] += coarse_edge_dys[v];
                edge_triv_rejs[v] += coarse_edge_dys[v];
                edge_triv_accs[v] += coarse_edge_dys[v];
            }
        }

        self.tile_perfcounters[tile_id].largetri_tile_raster += self.clock.ticks() - t0;
    }
}
