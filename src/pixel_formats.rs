// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Pixel types and the bitmap variants a texture can be uploaded from.
//!
//! A [`Bitmap`] is a closed set of variants.  Each variant maps to exactly one choice of native
//! upload parameters, and the materializer matches on it exhaustively, so adding a variant is a
//! compile error everywhere an upload decision is made.
//!
//! | Variant                      | Format      | Type            | Pixels uploaded |
//! |------------------------------|-------------|-----------------|-----------------|
//! | [`Bitmap::Indexed8`]         | `LUMINANCE` | `UNSIGNED_BYTE` | yes             |
//! | [`Bitmap::Float32`]          | `RGBA`      | `FLOAT`         | yes             |
//! | [`Bitmap::PlatformNative`]   | none        | none            | bound in place  |
//! | [`Bitmap::EmptyPlaceholder`] | `RGBA`      | `UNSIGNED_BYTE` | storage only    |
//! | [`Bitmap::Rgba32`]           | `RGBA`      | `UNSIGNED_BYTE` | yes             |
//!
//! # Examples
//!
//! ```
//! use accelerated_graphics::pixel_formats::{Bitmap, Unorm4};
//!
//! let red = Bitmap::solid(2, 2, Unorm4 { r: 255, g: 0, b: 0, a: 255 });
//! assert_eq!(red.width(), 2);
//! assert!(red.is_premultiplied());
//! ```

pub(crate) mod png_support;

pub use png_support::PngError;

use crate::bindings::buffer::CRepr;
use crate::bindings::texture::TextureTarget;
use crate::imp::NativeId;
use std::sync::Arc;

/// C-compatible RGBA pixel with 8-bit normalized unsigned values.
///
/// ```
/// use accelerated_graphics::pixel_formats::{Unorm4, Float4};
///
/// let unorm_color = Unorm4::from_floats(Float4 { r: 1.0, g: 0.5, b: 0.0, a: 1.0 });
/// assert_eq!(unorm_color.g, 128);
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unorm4 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
unsafe impl CRepr for Unorm4 {}

impl Unorm4 {
    /// Convert from normalized float values (0.0-1.0) to 8-bit values (0-255).
    ///
    /// Values are clamped to the valid range and rounded to nearest integer.
    pub fn from_floats(float4: Float4) -> Self {
        Unorm4 {
            r: (float4.r * 255.0).round().clamp(0.0, 255.0) as u8,
            g: (float4.g * 255.0).round().clamp(0.0, 255.0) as u8,
            b: (float4.b * 255.0).round().clamp(0.0, 255.0) as u8,
            a: (float4.a * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }

    /// Scales the color channels by alpha.
    pub fn premultiplied(self) -> Self {
        let scale = |c: u8| ((c as u16 * self.a as u16 + 127) / 255) as u8;
        Unorm4 {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }
}

/// Linear RGBA color with 32-bit float channels.
///
/// This is both the pixel type of [`Bitmap::Float32`] and the clear color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Float4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}
unsafe impl CRepr for Float4 {}

impl Float4 {
    pub const TRANSPARENT: Float4 = Float4::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Float4 = Float4::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Float4 = Float4::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Float4 = Float4::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Float4 = Float4::new(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Float4 = Float4::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Float4 { r, g, b, a }
    }
}

impl From<Unorm4> for Float4 {
    fn from(c: Unorm4) -> Self {
        Float4 {
            r: c.r as f32 / 255.0,
            g: c.g as f32 / 255.0,
            b: c.b as f32 / 255.0,
            a: c.a as f32 / 255.0,
        }
    }
}

/// A texture owned by someone else, such as a video decoder or camera surface.
///
/// `id` must be a name the backend can bind.  With the glow backend, get one from
/// `GlowBackend::adopt_texture`; [RecordingBackend](crate::imp::recording::RecordingBackend)
/// binds whatever it is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeTexture {
    pub id: NativeId,
    pub target: TextureTarget,
}

/// A 2D image in one of the forms a texture can be materialized from.
///
/// Pixel storage is shared, so cloning a bitmap is cheap.
#[derive(Clone, Debug, PartialEq)]
pub enum Bitmap {
    /// One byte per pixel, uploaded as luminance.
    Indexed8 {
        width: u32,
        height: u32,
        data: Arc<[u8]>,
    },
    /// Four floats per pixel.
    Float32 {
        width: u32,
        height: u32,
        data: Arc<[Float4]>,
    },
    /// A texture that already exists natively; it is bound instead of uploaded.
    PlatformNative {
        width: u32,
        height: u32,
        texture: NativeTexture,
    },
    /// Geometry without contents.  Materializing allocates storage and uploads nothing.
    EmptyPlaceholder { width: u32, height: u32 },
    /// Four bytes per pixel.
    Rgba32 {
        width: u32,
        height: u32,
        premultiplied: bool,
        data: Arc<[Unorm4]>,
    },
}

fn assert_area(width: u32, height: u32, len: usize) {
    assert_eq!(
        width as usize * height as usize,
        len,
        "bitmap of {width}x{height} needs {} pixels, got {len}",
        width as usize * height as usize
    );
}

impl Bitmap {
    /// # Panics
    /// If `data` does not hold exactly `width * height` pixels.
    pub fn rgba32(width: u32, height: u32, data: Vec<Unorm4>, premultiplied: bool) -> Self {
        assert_area(width, height, data.len());
        Bitmap::Rgba32 {
            width,
            height,
            premultiplied,
            data: data.into(),
        }
    }

    /// A premultiplied bitmap filled with `color`.
    pub fn solid(width: u32, height: u32, color: Unorm4) -> Self {
        let data = vec![color; width as usize * height as usize];
        Bitmap::rgba32(width, height, data, true)
    }

    /// # Panics
    /// If `data` does not hold exactly `width * height` pixels.
    pub fn indexed8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_area(width, height, data.len());
        Bitmap::Indexed8 {
            width,
            height,
            data: data.into(),
        }
    }

    /// # Panics
    /// If `data` does not hold exactly `width * height` pixels.
    pub fn float32(width: u32, height: u32, data: Vec<Float4>) -> Self {
        assert_area(width, height, data.len());
        Bitmap::Float32 {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Bitmap::EmptyPlaceholder { width, height }
    }

    pub fn platform_native(width: u32, height: u32, texture: NativeTexture) -> Self {
        Bitmap::PlatformNative {
            width,
            height,
            texture,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Bitmap::Indexed8 { width, .. }
            | Bitmap::Float32 { width, .. }
            | Bitmap::PlatformNative { width, .. }
            | Bitmap::EmptyPlaceholder { width, .. }
            | Bitmap::Rgba32 { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Bitmap::Indexed8 { height, .. }
            | Bitmap::Float32 { height, .. }
            | Bitmap::PlatformNative { height, .. }
            | Bitmap::EmptyPlaceholder { height, .. }
            | Bitmap::Rgba32 { height, .. } => *height,
        }
    }

    /// Only [`Bitmap::Rgba32`] carries straight alpha; everything else counts as premultiplied.
    pub fn is_premultiplied(&self) -> bool {
        match self {
            Bitmap::Rgba32 { premultiplied, .. } => *premultiplied,
            Bitmap::Indexed8 { .. }
            | Bitmap::Float32 { .. }
            | Bitmap::PlatformNative { .. }
            | Bitmap::EmptyPlaceholder { .. } => true,
        }
    }

    /// The externally owned texture, for [`Bitmap::PlatformNative`].
    pub fn native_texture(&self) -> Option<NativeTexture> {
        match self {
            Bitmap::PlatformNative { texture, .. } => Some(*texture),
            _ => None,
        }
    }

    /// Raw bytes to upload, or `None` when nothing is uploaded.
    pub(crate) fn pixel_bytes(&self) -> Option<&[u8]> {
        match self {
            Bitmap::Indexed8 { data, .. } => Some(&data[..]),
            Bitmap::Float32 { data, .. } => Some(crate::bindings::buffer::as_bytes(data)),
            Bitmap::Rgba32 { data, .. } => Some(crate::bindings::buffer::as_bytes(data)),
            Bitmap::PlatformNative { .. } | Bitmap::EmptyPlaceholder { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_scales_by_alpha() {
        let c = Unorm4 {
            r: 255,
            g: 128,
            b: 0,
            a: 128,
        }
        .premultiplied();
        assert_eq!(c, Unorm4 { r: 128, g: 64, b: 0, a: 128 });
    }

    #[test]
    fn dimensions_come_from_variant() {
        assert_eq!(Bitmap::empty(3, 5).height(), 5);
        assert_eq!(Bitmap::indexed8(2, 1, vec![0, 1]).width(), 2);
    }

    #[test]
    #[should_panic]
    fn mismatched_area_panics() {
        Bitmap::indexed8(2, 2, vec![0]);
    }

    #[test]
    fn pixel_bytes_per_variant() {
        assert_eq!(Bitmap::solid(2, 2, Unorm4::default()).pixel_bytes().map(<[u8]>::len), Some(16));
        assert_eq!(Bitmap::float32(1, 1, vec![Float4::RED]).pixel_bytes().map(<[u8]>::len), Some(16));
        assert_eq!(Bitmap::empty(4, 4).pixel_bytes(), None);
    }

    #[test]
    fn straight_alpha_is_reported() {
        let b = Bitmap::rgba32(1, 1, vec![Unorm4::default()], false);
        assert!(!b.is_premultiplied());
    }
}
