//! Writing packed readbacks to image files
//!
//! Everything here operates on the row-major RGBA output of
//! [`Framebuffer::pack_row_major`], never on the swizzled planes. Handy for
//! screenshots and for leaving inspectable artifacts behind in tests.
//!
//! See <https://en.wikipedia.org/wiki/Netpbm_format#PPM_example> for the
//! PPM layout; PNG goes through the `image` crate.

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use crate::framebuffer::{Attachment, Framebuffer, PixelFormat};

/// Write RGBA pixels as a binary P6 PPM, dropping the alpha channel.
pub fn write_ppm<P: AsRef<Path>>(
    rgba: &[u8],
    width: usize,
    height: usize,
    filename: P,
) -> Result<(), std::io::Error> {
    assert!(rgba.len() >= width * height * 4);

    let mut fd = File::create(filename)?;
    write!(fd, "P6 {} {} 255 ", width, height)?;

    let mut rgb = Vec::with_capacity(width * height * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    fd.write_all(&rgb)?;
    Ok(())
}

/// Write RGBA pixels as a PNG file.
pub fn write_png<P: AsRef<Path>>(
    rgba: &[u8],
    width: usize,
    height: usize,
    filename: P,
) -> image::ImageResult<()> {
    image::save_buffer(
        filename,
        rgba,
        width as u32,
        height as u32,
        image::ColorType::Rgba8,
    )
}

/// Pack the whole color attachment of `fb` and write it as a PNG.
pub fn save_color_png<P: AsRef<Path>>(fb: &Framebuffer, filename: P) -> image::ImageResult<()> {
    let (width, height) = (fb.width(), fb.height());
    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    fb.pack_row_major(
        Attachment::Color0,
        0,
        0,
        width,
        height,
        PixelFormat::Rgba8Unorm,
        &mut rgba,
    );
    write_png(&rgba, width as usize, height as usize, filename)
}
