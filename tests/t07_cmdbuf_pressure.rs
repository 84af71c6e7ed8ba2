use swrast::fixed::flt_s1516;
use swrast::{Attachment, Framebuffer, PixelFormat};

const W: usize = 128;

// window pixel coordinates -> s15.16 clip space on a 128 wide framebuffer
fn clip_x(px: f32) -> i32 {
    flt_s1516(px / 64.0 - 1.0)
}

fn clip_y(py: f32) -> i32 {
    flt_s1516(1.0 - py / 64.0)
}

fn cell_triangle(cell_x: usize, cell_y: usize) -> Vec<i32> {
    // a small right triangle inside the 16x16 cell, clear of its borders
    let x0 = (cell_x * 16) as f32 + 2.0;
    let y0 = (cell_y * 16) as f32 + 2.0;
    let one = flt_s1516(1.0);
    vec![
        clip_x(x0), clip_y(y0), 0, one,
        clip_x(x0 + 10.0), clip_y(y0), 0, one,
        clip_x(x0), clip_y(y0 + 10.0), 0, one,
    ]
}

// A 128x128 framebuffer is a single tile with a single 128-word command
// ring. 64 small-triangle commands at 20 words each overflow it many times
// over; the push protocol must flush inline and drop nothing.
#[test]
fn t07_ring_overflow_drops_nothing() {
    let mut fb = Framebuffer::new(W as i32, W as i32);
    assert_eq!(fb.total_num_tiles(), 1);

    fb.clear(0x0000_0000);

    // no resolve in between: everything queues onto the one tile
    for cell_y in 0..8 {
        for cell_x in 0..8 {
            fb.draw(&cell_triangle(cell_x, cell_y));
        }
    }
    fb.resolve();

    let mut buf = vec![0u8; W * W * 4];
    fb.pack_row_major(Attachment::Color0, 0, 0, W as i32, W as i32, PixelFormat::Rgba8Unorm, &mut buf);
    let covered = |x: usize, y: usize| buf[(y * W + x) * 4 + 3] != 0;

    // every cell got its triangle
    for cell_y in 0..8 {
        for cell_x in 0..8 {
            let mut n = 0;
            for y in cell_y * 16..cell_y * 16 + 16 {
                for x in cell_x * 16..cell_x * 16 + 16 {
                    n += covered(x, y) as usize;
                }
            }
            assert!(n >= 20, "cell {},{} only covered {} pixels", cell_x, cell_y, n);
        }
    }
}

// Same pressure, but the final state must also match a run that resolves
// after every draw: inline flushes must not change what gets drawn.
#[test]
fn t07_inline_flush_matches_eager_resolve() {
    let mut queued = Framebuffer::new(W as i32, W as i32);
    let mut eager = Framebuffer::new(W as i32, W as i32);

    queued.clear(0xFF00_00FF);
    eager.clear(0xFF00_00FF);
    eager.resolve();

    for cell_y in 0..8 {
        for cell_x in 0..8 {
            let tri = cell_triangle(cell_x, cell_y);
            queued.draw(&tri);
            eager.draw(&tri);
            eager.resolve();
        }
    }
    queued.resolve();

    let mut a = vec![0u8; W * W * 4];
    queued.pack_row_major(Attachment::Color0, 0, 0, W as i32, W as i32, PixelFormat::Rgba8Unorm, &mut a);
    let mut b = vec![0u8; W * W * 4];
    eager.pack_row_major(Attachment::Color0, 0, 0, W as i32, W as i32, PixelFormat::Rgba8Unorm, &mut b);
    assert_eq!(a, b);

    let mut da = vec![0u8; W * W * 4];
    queued.pack_row_major(Attachment::Depth, 0, 0, W as i32, W as i32, PixelFormat::R32Unorm, &mut da);
    let mut db = vec![0u8; W * W * 4];
    eager.pack_row_major(Attachment::Depth, 0, 0, W as i32, W as i32, PixelFormat::R32Unorm, &mut db);
    assert_eq!(da, db);
}
