//! Triangle setup
//!
//! Takes triangles in s15.16 clip space through near/far homogeneous
//! clipping, the viewport transform into s16.8 window coordinates,
//! backface/degenerate rejection and edge equation construction, then bins
//! them into the command rings of the tiles they touch. Triangles no wider
//! than a tile ("small") land in at most a 2x2 tile neighborhood and get a
//! pre-clipped coarse block range; larger ones are tested tile by tile
//! with trivial accept/reject edge offsets and ship only the edges that
//! still need per-pixel work.

use std::cmp::{max, min};

use crate::bits::{lzcnt32, lzcnt64};
use crate::cmdbuf::{DrawSmallTriCmd, DrawTileCmd};
use crate::fixed::{add_s1516, div_s1516, int_s1516, mul_s1516, s168_from_s1516};
use crate::framebuffer::Framebuffer;
use crate::{COARSE_BLOCK_WIDTH_IN_PIXELS, TILE_WIDTH_IN_COARSE_BLOCKS, TILE_WIDTH_IN_PIXELS};

/// One vertex in s15.16 clip space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ClipVert {
    x: i32,
    y: i32,
    z: i32,
    w: i32,
}

/// One vertex in window coordinates: s16.8 x/y, s15.16 z.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct WindowVert {
    x: i32,
    y: i32,
    z: i32,
}

/// Window-space bounding box, s16.8.
#[derive(Debug, Clone, Copy)]
struct Bbox {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipPlane {
    /// `z >= 0`
    Near,
    /// `z < w`
    Far,
}

enum ClipResult {
    /// The triangle survived, possibly with edges cut short.
    Kept,
    /// Every vertex is behind the plane.
    FullyClipped,
    /// One vertex was behind the plane; the quad left after cutting it off
    /// was split, and the first half must be rasterized separately.
    Split([ClipVert; 3]),
}

fn behind(v: ClipVert, plane: ClipPlane) -> bool {
    match plane {
        ClipPlane::Near => v.z < 0,
        ClipPlane::Far => v.z >= v.w,
    }
}

/// Intersect the edge `p -> q` with the plane: interpolate at
/// `a = d(p) / (d(p) - d(q))` where `d` is the signed plane distance, then
/// pin z exactly onto the plane.
fn clip_edge(p: ClipVert, q: ClipVert, plane: ClipPlane) -> ClipVert {
    let (dp, dq) = match plane {
        ClipPlane::Near => (p.z, q.z),
        ClipPlane::Far => (p.z - p.w, q.z - q.w),
    };

    let a = div_s1516(dp, dp - dq);
    let one_minus_a = int_s1516(1) - a;

    let x = mul_s1516(one_minus_a, p.x) + mul_s1516(a, q.x);
    let y = mul_s1516(one_minus_a, p.y) + mul_s1516(a, q.y);
    let w = mul_s1516(one_minus_a, p.w) + mul_s1516(a, q.w);
    assert!(w != 0);

    let z = match plane {
        ClipPlane::Near => 0,
        ClipPlane::Far => w - 1,
    };

    ClipVert { x, y, z, w }
}

/// Clip a triangle against one plane, mutating it in place.
fn clip_to_plane(verts: &mut [ClipVert; 3], plane: ClipPlane) -> ClipResult {
    let clipped = [
        behind(verts[0], plane),
        behind(verts[1], plane),
        behind(verts[2], plane),
    ];
    let num_clipped = clipped.iter().filter(|&&c| c).count();

    match num_clipped {
        0 => ClipResult::Kept,
        3 => ClipResult::FullyClipped,
        2 => {
            // two vertices behind the plane: cut both edges leaving the
            // surviving vertex short
            let unclipped = if !clipped[0] {
                0
            } else if !clipped[1] {
                1
            } else {
                2
            };
            let v1 = (unclipped + 1) % 3;
            let v2 = (unclipped + 2) % 3;

            verts[v1] = clip_edge(verts[unclipped], verts[v1], plane);
            verts[v2] = clip_edge(verts[unclipped], verts[v2], plane);
            ClipResult::Kept
        }
        _ => {
            // one vertex behind the plane: the clipped triangle is a quad,
            // so triangulate it into two
            let gone = if clipped[0] {
                0
            } else if clipped[1] {
                1
            } else {
                2
            };
            let v1 = (gone + 1) % 3;
            let v2 = (gone + 2) % 3;

            let clipped1 = clip_edge(verts[gone], verts[v1], plane);
            let clipped2 = clip_edge(verts[gone], verts[v2], plane);

            let mut first_half = *verts;
            first_half[gone] = clipped1;

            // leave self set up as the second half
            verts[gone] = clipped2;
            verts[v1] = clipped1;

            ClipResult::Split(first_half)
        }
    }
}

fn rotate3<T: Copy>(a: &mut [T; 3], by: usize) {
    let orig = *a;
    for i in 0..3 {
        a[i] = orig[(i + by) % 3];
    }
}

impl Framebuffer {
    /// Draw triangles from a flat vertex stream.
    ///
    /// `vertices` holds 4-component s15.16 clip space tuples (x, y, z, w),
    /// three per triangle, in clockwise window order. Panics if the slice
    /// does not hold a whole number of triangles.
    pub fn draw(&mut self, vertices: &[i32]) {
        assert!(
            vertices.len() % 12 == 0,
            "vertex stream must be whole triangles of 4-component vertices"
        );

        for tri in vertices.chunks_exact(12) {
            let verts = [
                ClipVert { x: tri[0], y: tri[1], z: tri[2], w: tri[3] },
                ClipVert { x: tri[4], y: tri[5], z: tri[6], w: tri[7] },
                ClipVert { x: tri[8], y: tri[9], z: tri[10], w: tri[11] },
            ];
            self.rasterize_triangle(verts);
        }
    }

    /// Draw triangles gathering vertices through an index stream.
    ///
    /// Each index addresses one 4-component tuple in `vertices`. Panics if
    /// the index count is not a multiple of three.
    pub fn draw_indexed(&mut self, vertices: &[i32], indices: &[u32]) {
        assert!(
            indices.len() % 3 == 0,
            "index stream must be whole triangles"
        );

        for tri in indices.chunks_exact(3) {
            let mut verts = [ClipVert::default(); 3];
            for (vert, &index) in verts.iter_mut().zip(tri) {
                let c = index as usize * 4;
                *vert = ClipVert {
                    x: vertices[c],
                    y: vertices[c + 1],
                    z: vertices[c + 2],
                    w: vertices[c + 3],
                };
            }
            self.rasterize_triangle(verts);
        }
    }

    fn rasterize_triangle(&mut self, mut clip_verts: [ClipVert; 3]) {
        let mut t0 = self.clock.ticks();

        // clip against the near then the far plane; a split recurses to
        // rasterize the first half and continues with the second
        for &plane in &[ClipPlane::Near, ClipPlane::Far] {
            match clip_to_plane(&mut clip_verts, plane) {
                ClipResult::Kept => {}
                ClipResult::FullyClipped => {
                    self.perfcounters.clipping += self.clock.ticks() - t0;
                    return;
                }
                ClipResult::Split(first_half) => {
                    self.perfcounters.clipping += self.clock.ticks() - t0;
                    self.rasterize_triangle(first_half);
                    t0 = self.clock.ticks();
                }
            }
        }
        self.perfcounters.clipping += self.clock.ticks() - t0;

        let mut t0 = self.clock.ticks();

        // transform from clip space to window coordinates
        let mut verts = [WindowVert::default(); 3];
        for (win, clip) in verts.iter_mut().zip(&clip_verts) {
            let one_over_w = div_s1516(int_s1516(1), clip.w);

            win.x = s168_from_s1516(mul_s1516(
                div_s1516(
                    add_s1516(mul_s1516(clip.x, one_over_w), int_s1516(1)),
                    int_s1516(2),
                ),
                int_s1516(self.width_in_pixels),
            ));
            win.y = s168_from_s1516(mul_s1516(
                div_s1516(
                    add_s1516(mul_s1516(-clip.y, one_over_w), int_s1516(1)),
                    int_s1516(2),
                ),
                int_s1516(self.height_in_pixels),
            ));
            win.z = mul_s1516(clip.z, one_over_w);
        }

        let mut min_z = verts[0].z as u32;
        let mut max_z = verts[0].z as u32;
        for v in &verts[1..] {
            min_z = min(min_z, v.z as u32);
            max_z = max(max_z, v.z as u32);
        }

        let bbox = Bbox {
            min_x: min(verts[0].x, min(verts[1].x, verts[2].x)),
            min_y: min(verts[0].y, min(verts[1].y, verts[2].y)),
            max_x: max(verts[0].x, max(verts[1].x, verts[2].x)),
            max_y: max(verts[0].y, max(verts[1].y, verts[2].y)),
        };

        // drop triangles fully outside the scissor rect (= the window)
        if bbox.max_x < 0
            || bbox.max_y < 0
            || bbox.min_x >= self.width_in_pixels << 8
            || bbox.min_y >= self.height_in_pixels << 8
        {
            self.perfcounters.common_setup += self.clock.ticks() - t0;
            return;
        }

        let clamped = Bbox {
            min_x: max(bbox.min_x, 0),
            min_y: max(bbox.min_y, 0),
            max_x: min(bbox.max_x, (self.width_in_pixels << 8) - 1),
            max_y: min(bbox.max_y, (self.height_in_pixels << 8) - 1),
        };

        // "small" triangles are no wider than a tile
        let is_large = bbox.max_x - bbox.min_x >= TILE_WIDTH_IN_PIXELS << 8
            || bbox.max_y - bbox.min_y >= TILE_WIDTH_IN_PIXELS << 8;

        self.perfcounters.common_setup += self.clock.ticks() - t0;

        if is_large {
            self.bin_large_triangle(verts, min_z, max_z, clamped);
        } else {
            self.bin_small_triangle(verts, min_z, max_z, bbox);
        }
    }

    /// Bin a triangle whose bbox fits in a 2x2 tile neighborhood.
    fn bin_small_triangle(
        &mut self,
        mut verts: [WindowVert; 3],
        min_z: u32,
        max_z: u32,
        bbox: Bbox,
    ) {
        let mut t0 = self.clock.ticks();

        // note: the unclamped bbox, so tile indices may hang off screen;
        // the per-tile guards below sort that out
        let first_tile_x = (bbox.min_x >> 8) / TILE_WIDTH_IN_PIXELS;
        let first_tile_y = (bbox.min_y >> 8) / TILE_WIDTH_IN_PIXELS;
        let last_tile_x = (bbox.max_x >> 8) / TILE_WIDTH_IN_PIXELS;
        let last_tile_y = (bbox.max_y >> 8) / TILE_WIDTH_IN_PIXELS;

        let first_tile_px_x = (first_tile_x << 8) * TILE_WIDTH_IN_PIXELS;
        let first_tile_px_y = (first_tile_y << 8) * TILE_WIDTH_IN_PIXELS;
        let last_tile_px_x = (last_tile_x << 8) * TILE_WIDTH_IN_PIXELS;
        let last_tile_px_y = (last_tile_y << 8) * TILE_WIDTH_IN_PIXELS;

        // coarse block range touched, relative to the top left tile
        let first_rel_cb_x = ((bbox.min_x - first_tile_px_x) >> 8) / COARSE_BLOCK_WIDTH_IN_PIXELS;
        let first_rel_cb_y = ((bbox.min_y - first_tile_px_y) >> 8) / COARSE_BLOCK_WIDTH_IN_PIXELS;
        let last_rel_cb_x = ((bbox.max_x - first_tile_px_x) >> 8) / COARSE_BLOCK_WIDTH_IN_PIXELS;
        let last_rel_cb_y = ((bbox.max_y - first_tile_px_y) >> 8) / COARSE_BLOCK_WIDTH_IN_PIXELS;

        // localize the vertices to the last tile so the edge equations fit
        // 16 bits of precision
        for v in verts.iter_mut() {
            debug_assert!(v.x - last_tile_px_x >= -128 << 8 && v.x - last_tile_px_x <= (128 << 8) - 1);
            debug_assert!(v.y - last_tile_px_y >= -128 << 8 && v.y - last_tile_px_y <= (128 << 8) - 1);
            v.x -= last_tile_px_x;
            v.y -= last_tile_px_y;
        }

        let triarea2 = ((i64::from(verts[1].x - verts[0].x) * i64::from(verts[2].y - verts[0].y)
            - i64::from(verts[1].y - verts[0].y) * i64::from(verts[2].x - verts[0].x))
            >> 8) as i32;

        if triarea2 == 0 {
            self.perfcounters.smalltri_setup += self.clock.ticks() - t0;
            return;
        }

        // winding correction
        let triarea2 = if triarea2 < 0 {
            verts.swap(1, 2);
            -triarea2
        } else {
            triarea2
        };

        // 1/(2 area) as a pseudo float with an 8 bit mantissa
        let triarea2_lzcnt = lzcnt32(triarea2 as u32) as i32;
        let triarea2_mantissa_rshift = (31 - 8) - triarea2_lzcnt;
        let triarea2_mantissa = if triarea2_mantissa_rshift < 0 {
            triarea2 << -triarea2_mantissa_rshift
        } else {
            triarea2 >> triarea2_mantissa_rshift
        };

        // the mantissa is normalized 1.8 here, and so is the numerator
        let mut rcp_triarea2_mantissa = 0xFFFF / triarea2_mantissa;
        debug_assert!(rcp_triarea2_mantissa != 0);

        // denormalize the reciprocal so it fits in 8 bits
        let rcp_triarea2_mantissa_rshift = (31 - 7) - lzcnt32(rcp_triarea2_mantissa as u32) as i32;
        if rcp_triarea2_mantissa_rshift < 0 {
            rcp_triarea2_mantissa <<= -rcp_triarea2_mantissa_rshift;
        } else {
            rcp_triarea2_mantissa >>= rcp_triarea2_mantissa_rshift;
        }

        debug_assert!(rcp_triarea2_mantissa < 0x100);
        let rcp_triarea2_exponent =
            127 + triarea2_mantissa_rshift - rcp_triarea2_mantissa_rshift;
        let rcp_triarea2 =
            ((rcp_triarea2_exponent as u32) << 8) | (rcp_triarea2_mantissa as u32 & 0xFF);

        // edge equations, cheap in 32 bits thanks to the localized vertices
        let mut edges = [0i32; 3];
        let mut edge_dxs = [0i32; 3];
        let mut edge_dys = [0i32; 3];
        for v in 0..3 {
            let v1 = (v + 1) % 3;

            edge_dxs[v] = verts[v1].y - verts[v].y;
            edge_dys[v] = verts[v].x - verts[v1].x;

            // E(p) = (b.x - a.x)(p.y - a.y) - (b.y - a.y)(p.x - a.x),
            // evaluated at the pixel center (0.5, 0.5)
            const S168_HALF: i32 = 0x80;
            let mut e = i64::from(S168_HALF - verts[v].x) * i64::from(edge_dxs[v])
                - i64::from(S168_HALF - verts[v].y) * i64::from(-edge_dys[v]);

            // top-left rule: shift top-left edges ever so slightly outward
            // so they break the tie on edges shared between triangles
            if (verts[v].y == verts[v1].y && verts[v].x < verts[v1].x) || verts[v].y > verts[v1].y {
                e -= 1;
            }

            // truncate; the top-left rule doubles as the rounding mode
            edges[v] = (e >> 8) as i32;
        }

        // rotate the vertex whose opposite edge has the steepest slope into
        // slot 0, keeping that edge out of the interpolation
        let mut max_slope_vertex = 0;
        let mut max_slope = 0i64;
        for i in 0..3 {
            let v1 = (i + 1) % 3;
            let slope = i64::from(edge_dxs[v1]) * i64::from(edge_dxs[v1])
                + i64::from(edge_dys[v1]) * i64::from(edge_dys[v1]);
            if slope > max_slope {
                max_slope_vertex = i;
                max_slope = slope;
            }
        }
        if max_slope_vertex > 0 {
            rotate3(&mut edges, max_slope_vertex);
            rotate3(&mut edge_dxs, max_slope_vertex);
            rotate3(&mut edge_dys, max_slope_vertex);
            rotate3(&mut verts, max_slope_vertex);
        }

        let mut cmd = DrawSmallTriCmd {
            edge_dxs,
            edge_dys,
            vert_zs: [verts[0].z, verts[1].z, verts[2].z],
            min_z,
            max_z,
            rcp_triarea2,
            ..DrawSmallTriCmd::default()
        };

        let first_tile_id = first_tile_y * self.width_in_tiles + first_tile_x;

        // top left tile
        if first_tile_x >= 0 && first_tile_y >= 0 {
            for v in 0..3 {
                cmd.edges[v] = edges[v]
                    + (edge_dxs[v] * (first_tile_x - last_tile_x)
                        + edge_dys[v] * (first_tile_y - last_tile_y))
                        * TILE_WIDTH_IN_PIXELS;
            }
            cmd.first_coarse_x = max(first_rel_cb_x, 0);
            cmd.last_coarse_x = min(last_rel_cb_x, TILE_WIDTH_IN_COARSE_BLOCKS - 1);
            cmd.first_coarse_y = max(first_rel_cb_y, 0);
            cmd.last_coarse_y = min(last_rel_cb_y, TILE_WIDTH_IN_COARSE_BLOCKS - 1);

            self.perfcounters.smalltri_setup += self.clock.ticks() - t0;
            self.push_tilecmd(first_tile_id as usize, &cmd.encode());
            t0 = self.clock.ticks();
        }

        // top right tile
        if last_tile_x > first_tile_x && last_tile_x < self.width_in_tiles && first_tile_y >= 0 {
            for v in 0..3 {
                cmd.edges[v] = edges[v]
                    + edge_dys[v] * (first_tile_y - last_tile_y) * TILE_WIDTH_IN_PIXELS;
            }
            cmd.first_coarse_x = 0;
            cmd.last_coarse_x = min(
                last_rel_cb_x - TILE_WIDTH_IN_COARSE_BLOCKS,
                TILE_WIDTH_IN_COARSE_BLOCKS - 1,
            );
            cmd.first_coarse_y = max(first_rel_cb_y, 0);
            cmd.last_coarse_y = min(last_rel_cb_y, TILE_WIDTH_IN_COARSE_BLOCKS - 1);

            self.perfcounters.smalltri_setup += self.clock.ticks() - t0;
            self.push_tilecmd((first_tile_id + 1) as usize, &cmd.encode());
            t0 = self.clock.ticks();
        }

        // bottom left tile
        if last_tile_y > first_tile_y && first_tile_x >= 0 && last_tile_y < self.height_in_tiles {
            for v in 0..3 {
                cmd.edges[v] = edges[v]
                    + edge_dxs[v] * (first_tile_x - last_tile_x) * TILE_WIDTH_IN_PIXELS;
            }
            cmd.first_coarse_x = max(first_rel_cb_x, 0);
            cmd.last_coarse_x = min(last_rel_cb_x, TILE_WIDTH_IN_COARSE_BLOCKS - 1);
            cmd.first_coarse_y = 0;
            cmd.last_coarse_y = min(
                last_rel_cb_y - TILE_WIDTH_IN_COARSE_BLOCKS,
                TILE_WIDTH_IN_COARSE_BLOCKS - 1,
            );

            let tile_id_down = first_tile_id + self.width_in_tiles;
            self.perfcounters.smalltri_setup += self.clock.ticks() - t0;
            self.push_tilecmd(tile_id_down as usize, &cmd.encode());
            t0 = self.clock.ticks();
        }

        // bottom right tile
        if last_tile_x > first_tile_x
            && last_tile_y > first_tile_y
            && last_tile_x < self.width_in_tiles
            && last_tile_y < self.height_in_tiles
        {
            cmd.edges = edges;
            cmd.first_coarse_x = 0;
            cmd.last_coarse_x = min(
                last_rel_cb_x - TILE_WIDTH_IN_COARSE_BLOCKS,
                TILE_WIDTH_IN_COARSE_BLOCKS - 1,
            );
            cmd.first_coarse_y = 0;
            cmd.last_coarse_y = min(
                last_rel_cb_y - TILE_WIDTH_IN_COARSE_BLOCKS,
                TILE_WIDTH_IN_COARSE_BLOCKS - 1,
            );

            let tile_id_downright = first_tile_id + 1 + self.width_in_tiles;
            self.perfcounters.smalltri_setup += self.clock.ticks() - t0;
            self.push_tilecmd(tile_id_downright as usize, &cmd.encode());
            t0 = self.clock.ticks();
        }

        self.perfcounters.smalltri_setup += self.clock.ticks() - t0;
    }

    /// Bin a triangle wider than a tile by walking every tile in its
    /// clamped bbox.
    fn bin_large_triangle(
        &mut self,
        mut verts: [WindowVert; 3],
        min_z: u32,
        max_z: u32,
        clamped_bbox: Bbox,
    ) {
        let mut t0 = self.clock.ticks();

        let first_tile_x = (clamped_bbox.min_x >> 8) / TILE_WIDTH_IN_PIXELS;
        let first_tile_y = (clamped_bbox.min_y >> 8) / TILE_WIDTH_IN_PIXELS;
        let last_tile_x = (clamped_bbox.max_x >> 8) / TILE_WIDTH_IN_PIXELS;
        let last_tile_y = (clamped_bbox.max_y >> 8) / TILE_WIDTH_IN_PIXELS;

        let first_tile_px_x = (first_tile_x << 8) * TILE_WIDTH_IN_PIXELS;
        let first_tile_px_y = (first_tile_y << 8) * TILE_WIDTH_IN_PIXELS;

        // 64 bit edge equations here: the product of two s16.8 window
        // coordinates needs up to 48 bits. The extra setup cost is noise
        // next to the pixels a large triangle generates.
        let triarea2 = (i64::from(verts[1].x - verts[0].x) * i64::from(verts[2].y - verts[0].y)
            - i64::from(verts[1].y - verts[0].y) * i64::from(verts[2].x - verts[0].x))
            >> 8;

        if triarea2 == 0 {
            self.perfcounters.largetri_setup += self.clock.ticks() - t0;
            return;
        }

        let triarea2 = if triarea2 < 0 {
            verts.swap(1, 2);
            -triarea2
        } else {
            triarea2
        };

        // 1/(2 area), 16 bit mantissa this time
        let triarea2_lzcnt = lzcnt64(triarea2 as u64) as i32;
        let triarea2_mantissa_rshift = (63 - 16) - triarea2_lzcnt;
        let triarea2_mantissa = if triarea2_mantissa_rshift < 0 {
            (triarea2 << -triarea2_mantissa_rshift) as i32
        } else {
            (triarea2 >> triarea2_mantissa_rshift) as i32
        };

        // the mantissa is normalized 1.16 here, and so is the numerator
        let mut rcp_triarea2_mantissa = (0xFFFF_FFFFu32 / triarea2_mantissa as u32) as i32;
        debug_assert!(rcp_triarea2_mantissa != 0);

        let rcp_triarea2_mantissa_rshift = (31 - 15) - lzcnt32(rcp_triarea2_mantissa as u32) as i32;
        if rcp_triarea2_mantissa_rshift < 0 {
            rcp_triarea2_mantissa <<= -rcp_triarea2_mantissa_rshift;
        } else {
            rcp_triarea2_mantissa >>= rcp_triarea2_mantissa_rshift;
        }

        debug_assert!(rcp_triarea2_mantissa < 0x10000);
        let rcp_triarea2_exponent =
            127 + triarea2_mantissa_rshift - rcp_triarea2_mantissa_rshift;
        let rcp_triarea2 =
            ((rcp_triarea2_exponent as u32) << 16) | (rcp_triarea2_mantissa as u32 & 0xFFFF);

        // edge equations at the top left tile's origin
        let mut edges = [0i64; 3];
        let mut edge_dxs = [0i64; 3];
        let mut edge_dys = [0i64; 3];
        for v in 0..3 {
            let v1 = (v + 1) % 3;

            edge_dxs[v] = i64::from(verts[v1].y - verts[v].y);
            edge_dys[v] = i64::from(verts[v].x - verts[v1].x);

            const S168_HALF: i64 = 0x80;
            let mut e = (i64::from(first_tile_px_x) + S168_HALF - i64::from(verts[v].x))
                * edge_dxs[v]
                - (i64::from(first_tile_px_y) + S168_HALF - i64::from(verts[v].y)) * -edge_dys[v];

            // top-left rule, as in the small path
            if (verts[v].y == verts[v1].y && verts[v].x < verts[v1].x) || verts[v].y > verts[v1].y {
                e -= 1;
            }

            edges[v] = e >> 8;
        }

        let mut tile_edge_dxs = [0i64; 3];
        let mut tile_edge_dys = [0i64; 3];
        for v in 0..3 {
            tile_edge_dxs[v] = edge_dxs[v] * i64::from(TILE_WIDTH_IN_PIXELS);
            tile_edge_dys[v] = edge_dys[v] * i64::from(TILE_WIDTH_IN_PIXELS);
        }

        // per tile trivial reject and accept corner offsets
        let mut edge_triv_rejs = [0i64; 3];
        let mut edge_triv_accs = [0i64; 3];
        for v in 0..3 {
            edge_triv_rejs[v] = edges[v];
            edge_triv_accs[v] = edges[v];
            if tile_edge_dxs[v] < 0 {
                edge_triv_rejs[v] += tile_edge_dxs[v];
            }
            if tile_edge_dxs[v] > 0 {
                edge_triv_accs[v] += tile_edge_dxs[v];
            }
            if tile_edge_dys[v] < 0 {
                edge_triv_rejs[v] += tile_edge_dys[v];
            }
            if tile_edge_dys[v] > 0 {
                edge_triv_accs[v] += tile_edge_dys[v];
            }
        }

        let mut tile_row_start = first_tile_y * self.width_in_tiles + first_tile_x;

        for _tile_y in first_tile_y..=last_tile_y {
            let mut tile_i_edges = edges;
            let mut tile_i_edge_triv_rejs = edge_triv_rejs;
            let mut tile_i_edge_triv_accs = edge_triv_accs;

            let mut tile_i = tile_row_start;

            for _tile_x in first_tile_x..=last_tile_x {
                // trivial reject if at least one edge misses the whole tile
                let trivially_rejected = tile_i_edge_triv_rejs[0] >= 0
                    || tile_i_edge_triv_rejs[1] >= 0
                    || tile_i_edge_triv_rejs[2] >= 0;

                if !trivially_rejected {
                    let edge_needs_test = [
                        tile_i_edge_triv_accs[0] >= 0,
                        tile_i_edge_triv_accs[1] >= 0,
                        tile_i_edge_triv_accs[2] >= 0,
                    ];
                    let num_tests_necessary =
                        edge_needs_test.iter().filter(|&&t| t).count();

                    // the N edges to test become the first N slots of the
                    // command, so rotate vertices and edges together
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

                    let mut cmd = DrawTileCmd {
                        num_test_edges: num_tests_necessary,
                        min_z,
                        max_z,
                        rcp_triarea2,
                        ..DrawTileCmd::default()
                    };
                    for v in 0..3 {
                        let rotated_v = (v + vertex_rotation) % 3;

                        if v < num_tests_necessary {
                            // edges that survive to per-pixel testing fit in
                            // 32 bits; that is what trivial accept bought us
                            debug_assert!(
                                tile_i_edges[rotated_v] >= i64::from(i32::min_value())
                                    && tile_i_edges[rotated_v] <= i64::from(i32::max_value())
                            );
                            cmd.edges[v] = tile_i_edges[rotated_v] as i32;
                        }
                        cmd.edge_dxs[v] = edge_dxs[rotated_v] as i32;
                        cmd.edge_dys[v] = edge_dys[rotated_v] as i32;
                        cmd.vert_zs[v] = verts[rotated_v].z;
                    }

                    let mut words = [0u32; 16];
                    let len = cmd.encode(&mut words);

                    self.perfcounters.largetri_setup += self.clock.ticks() - t0;
                    self.push_tilecmd(tile_i as usize, &words[..len]);
                    t0 = self.clock.ticks();
                }

                tile_i += 1;
                for v in 0..3 {
                    tile_i_edges[v] += tile_edge_dxs[v];
                    tile_i_edge_triv_rejs[v] += tile_edge_dxs[v];
                    tile_i_edge_triv_accs[v] += tile_edge_dxs[v];
                }
            }

            tile_row_start += self.width_in_tiles;
            for v in 0..3 {
                edges[v] += tile_edge_dys[v];
                edge_triv_rejs[v] += tile_edge_dys[v];
                edge_triv_accs[v] += tile_edge_dys[v];
            }
        }

        self.perfcounters.largetri_setup += self.clock.ticks() - t0;
    }
}
