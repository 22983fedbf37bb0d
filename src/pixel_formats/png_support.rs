// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::pixel_formats::{Bitmap, Unorm4};
use png::{BitDepth, ColorType, Transformations};
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PngError {
    #[error("PNG decoding failed: {0}")]
    Decoding(#[from] png::DecodingError),
    #[error("Unsupported PNG layout {color:?} at {depth:?}")]
    UnsupportedLayout { color: ColorType, depth: BitDepth },
}

impl Bitmap {
    /// Decodes PNG file contents into a premultiplied [`Bitmap::Rgba32`].
    ///
    /// Palette, grayscale and 16-bit images are normalized to 8-bit RGBA.
    pub fn from_png(data: &[u8]) -> Result<Bitmap, PngError> {
        let mut decoder = png::Decoder::new(Cursor::new(data));
        decoder.set_transformations(Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;
        let (color, depth) = reader.output_color_type();
        if depth != BitDepth::Eight {
            return Err(PngError::UnsupportedLayout { color, depth });
        }
        let width = reader.info().width;
        let height = reader.info().height;
        let mut raw = vec![0u8; width as usize * height as usize * color.samples()];
        let frame = reader.next_frame(&mut raw)?;
        let raw = &raw[..frame.buffer_size()];

        let pixels: Vec<Unorm4> = match color {
            ColorType::Rgba => raw
                .chunks_exact(4)
                .map(|p| Unorm4 { r: p[0], g: p[1], b: p[2], a: p[3] })
                .collect(),
            ColorType::Rgb => raw
                .chunks_exact(3)
                .map(|p| Unorm4 { r: p[0], g: p[1], b: p[2], a: 255 })
                .collect(),
            ColorType::GrayscaleAlpha => raw
                .chunks_exact(2)
                .map(|p| Unorm4 { r: p[0], g: p[0], b: p[0], a: p[1] })
                .collect(),
            ColorType::Grayscale => raw
                .iter()
                .map(|&l| Unorm4 { r: l, g: l, b: l, a: 255 })
                .collect(),
            ColorType::Indexed => return Err(PngError::UnsupportedLayout { color, depth }),
        };
        let pixels = pixels.into_iter().map(Unorm4::premultiplied).collect();
        Ok(Bitmap::rgba32(frame.width, frame.height, pixels, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(width: u32, height: u32, color: ColorType, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn decodes_rgba() {
        let png = encode(1, 2, ColorType::Rgba, &[255, 0, 0, 255, 0, 255, 0, 255]);
        let bitmap = Bitmap::from_png(&png).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (1, 2));
        let Bitmap::Rgba32 { data, premultiplied, .. } = bitmap else {
            panic!("expected rgba32");
        };
        assert!(premultiplied);
        assert_eq!(data[1], Unorm4 { r: 0, g: 255, b: 0, a: 255 });
    }

    #[test]
    fn grayscale_expands() {
        let png = encode(2, 1, ColorType::Grayscale, &[10, 20]);
        let Bitmap::Rgba32 { data, .. } = Bitmap::from_png(&png).unwrap() else {
            panic!("expected rgba32");
        };
        assert_eq!(data[1], Unorm4 { r: 20, g: 20, b: 20, a: 255 });
    }

    #[test]
    fn alpha_is_premultiplied() {
        let png = encode(1, 1, ColorType::Rgba, &[255, 255, 255, 0]);
        let Bitmap::Rgba32 { data, .. } = Bitmap::from_png(&png).unwrap() else {
            panic!("expected rgba32");
        };
        assert_eq!(data[0], Unorm4 { r: 0, g: 0, b: 0, a: 0 });
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(
            Bitmap::from_png(b"not a png"),
            Err(PngError::Decoding(_))
        ));
    }
}
