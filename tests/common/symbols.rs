//! QR rendering helpers shared by unit and integration tests

#![allow(dead_code)]

use qrcode::{Color, QrCode};
use std::io::Cursor;

/// Render `text` as a QR symbol with a 4-module quiet zone, `scale` pixels
/// per module. Returns the luminance plane and its side length.
pub fn render_qr(text: &str, scale: usize) -> (Vec<u8>, usize) {
    let code = QrCode::new(text.as_bytes()).expect("payload fits in a QR code");
    let modules = code.width();
    let colors = code.to_colors();
    let quiet = 4;
    let side = (modules + 2 * quiet) * scale;
    let mut luma = vec![255u8; side * side];
    for y in 0..side {
        for x in 0..side {
            let (mx, my) = (x / scale, y / scale);
            if mx < quiet || my < quiet || mx >= modules + quiet || my >= modules + quiet {
                continue;
            }
            if colors[(my - quiet) * modules + (mx - quiet)] == Color::Dark {
                luma[y * side + x] = 0;
            }
        }
    }
    (luma, side)
}

/// Encode a luminance plane as PNG bytes
pub fn png_bytes(luma: Vec<u8>, width: usize, height: usize) -> Vec<u8> {
    let image = image::GrayImage::from_raw(width as u32, height as u32, luma)
        .expect("buffer matches dimensions");
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .expect("PNG encoding");
    out.into_inner()
}

/// A PNG holding `text` as a QR code
pub fn qr_png(text: &str) -> Vec<u8> {
    let (luma, side) = render_qr(text, 6);
    png_bytes(luma, side, side)
}
