use swrast::{Attachment, Framebuffer, PixelFormat};

fn pack_color(fb: &Framebuffer) -> Vec<u8> {
    let (w, h) = (fb.width(), fb.height());
    let mut buf = vec![0u8; w as usize * h as usize * 4];
    fb.pack_row_major(Attachment::Color0, 0, 0, w, h, PixelFormat::Rgba8Unorm, &mut buf);
    buf
}

fn pack_depth(fb: &Framebuffer) -> Vec<u32> {
    let (w, h) = (fb.width(), fb.height());
    let mut buf = vec![0u8; w as usize * h as usize * 4];
    fb.pack_row_major(Attachment::Depth, 0, 0, w, h, PixelFormat::R32Unorm, &mut buf);
    buf.chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[test]
fn t01_empty_render() {
    let mut fb = Framebuffer::new(256, 256);
    fb.clear(0x0000_0000);
    fb.resolve();

    assert!(pack_color(&fb).iter().all(|&b| b == 0));
    assert!(pack_depth(&fb).iter().all(|&d| d == 0xFFFF_FFFF));
}

#[test]
fn t01_colored_clear_byte_orders() {
    // ARGB in the clear color: a=0x80 r=0x40 g=0x20 b=0x10
    let mut fb = Framebuffer::new(256, 256);
    fb.clear(0x8040_2010);
    fb.resolve();

    for px in pack_color(&fb).chunks_exact(4) {
        assert_eq!(px, [0x40, 0x20, 0x10, 0x80]);
    }

    let (w, h) = (fb.width(), fb.height());
    let mut bgra = vec![0u8; w as usize * h as usize * 4];
    fb.pack_row_major(Attachment::Color0, 0, 0, w, h, PixelFormat::Bgra8Unorm, &mut bgra);
    for px in bgra.chunks_exact(4) {
        assert_eq!(px, [0x10, 0x20, 0x40, 0x80]);
    }
}

#[test]
fn t01_resolve_idempotent() {
    let mut fb = Framebuffer::new(256, 256);
    fb.clear(0xFF12_3456);
    fb.resolve();
    let color = pack_color(&fb);
    let depth = pack_depth(&fb);

    // all rings are empty now; resolving again changes nothing
    fb.resolve();
    assert_eq!(pack_color(&fb), color);
    assert_eq!(pack_depth(&fb), depth);
}

#[test]
fn t01_partial_rect_pack_across_tiles() {
    // 300x300 pads to 3x3 tiles; a rect straddling the tile seam at 128
    // must still read back uniform
    let mut fb = Framebuffer::new(300, 300);
    fb.clear(0xFF11_2233);
    fb.resolve();

    let (rw, rh) = (64, 48);
    let mut buf = vec![0u8; rw * rh * 4];
    fb.pack_row_major(
        Attachment::Color0,
        100,
        110,
        rw as i32,
        rh as i32,
        PixelFormat::Rgba8Unorm,
        &mut buf,
    );
    for px in buf.chunks_exact(4) {
        assert_eq!(px, [0x11, 0x22, 0x33, 0xFF]);
    }
}

#[test]
#[should_panic]
fn t01_pack_rect_escaping_framebuffer_panics() {
    let fb = Framebuffer::new(256, 256);
    let mut buf = vec![0u8; 100 * 10 * 4];
    fb.pack_row_major(Attachment::Color0, 200, 0, 100, 10, PixelFormat::Rgba8Unorm, &mut buf);
}

#[test]
#[should_panic]
fn t01_depth_pack_needs_r32() {
    let fb = Framebuffer::new(256, 256);
    let mut buf = vec![0u8; 256 * 256 * 4];
    fb.pack_row_major(Attachment::Depth, 0, 0, 256, 256, PixelFormat::Rgba8Unorm, &mut buf);
}
