use swrast::fixed::flt_s1516;
use swrast::{Attachment, Framebuffer, PixelFormat};

const W: usize = 256;

fn quad(z: f32) -> Vec<i32> {
    // two triangles covering the window quadrant [128,256) x [0,128)
    let corners = [
        [(0.0, 1.0), (1.0, 1.0), (0.0, 0.0)],
        [(1.0, 1.0), (1.0, 0.0), (0.0, 0.0)],
    ];
    corners
        .iter()
        .flat_map(|tri| tri.iter())
        .flat_map(|&(x, y)| vec![flt_s1516(x), flt_s1516(y), flt_s1516(z), flt_s1516(1.0)])
        .collect()
}

fn render(draws: &[&[i32]]) -> (Vec<u8>, Vec<u8>) {
    let mut fb = Framebuffer::new(W as i32, W as i32);
    fb.clear(0x0000_0000);
    for d in draws {
        fb.draw(d);
    }
    fb.resolve();

    let mut color = vec![0u8; W * W * 4];
    fb.pack_row_major(Attachment::Color0, 0, 0, W as i32, W as i32, PixelFormat::Rgba8Unorm, &mut color);
    let mut depth = vec![0u8; W * W * 4];
    fb.pack_row_major(Attachment::Depth, 0, 0, W as i32, W as i32, PixelFormat::R32Unorm, &mut depth);
    (color, depth)
}

// S5: with a strict smaller-is-nearer depth test, the near geometry wins no
// matter which order the two are submitted in.
#[test]
fn t05_near_wins_both_orders() {
    let near = quad(0.2);
    let far = quad(0.8);

    let near_only = render(&[&near]);
    let near_then_far = render(&[&near, &far]);
    let far_then_near = render(&[&far, &near]);

    assert_eq!(near_then_far, near_only);
    assert_eq!(far_then_near, near_only);
}

#[test]
fn t05_depth_values_ordered() {
    let (_, near_depth) = render(&[&quad(0.2)]);
    let (_, far_depth) = render(&[&quad(0.8)]);

    let d = |buf: &[u8], x: usize, y: usize| {
        let i = (y * W + x) * 4;
        u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
    };

    // inside the quad the near render is strictly nearer; outside both are
    // at the cleared infinity
    for &(x, y) in &[(140, 20), (200, 64), (250, 120)] {
        assert!(d(&near_depth, x, y) < d(&far_depth, x, y), "at {},{}", x, y);
        assert!(d(&far_depth, x, y) < 0xFFFF_FFFF);
    }
    assert_eq!(d(&near_depth, 10, 200), 0xFFFF_FFFF);
    assert_eq!(d(&far_depth, 10, 200), 0xFFFF_FFFF);
}
