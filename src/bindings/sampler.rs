// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Texture unit bindings: which texture a sampler uniform reads, and how.

use crate::bindings::texture::Texture;
use crate::imp::gl_enums;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

impl WrapMode {
    pub(crate) fn gl(self) -> u32 {
        match self {
            WrapMode::ClampToEdge => gl_enums::CLAMP_TO_EDGE,
            WrapMode::Repeat => gl_enums::REPEAT,
            WrapMode::MirroredRepeat => gl_enums::MIRRORED_REPEAT,
        }
    }
}

/// A request to sample `texture` through one texture unit during one draw.
///
/// This is not resource state; it is consumed by the draw that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUnit {
    /// Unit to bind to.  `None` takes the next unit in uniform order.
    pub index: Option<u32>,
    pub texture: Option<Texture>,
    pub linear: bool,
    /// Blend between mip levels.  `None` follows `linear`.
    pub trilinear: Option<bool>,
    pub wrap: WrapMode,
}

impl TextureUnit {
    pub fn new(texture: &Texture) -> Self {
        TextureUnit {
            index: None,
            texture: Some(texture.clone()),
            linear: true,
            trilinear: None,
            wrap: WrapMode::ClampToEdge,
        }
    }

    /// A unit with no texture bound.
    pub fn empty() -> Self {
        TextureUnit {
            index: None,
            texture: None,
            linear: true,
            trilinear: None,
            wrap: WrapMode::ClampToEdge,
        }
    }

    pub fn nearest(mut self) -> Self {
        self.linear = false;
        self
    }

    pub fn with_trilinear(mut self, trilinear: bool) -> Self {
        self.trilinear = Some(trilinear);
        self
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn at(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// `(min, mag)` filters for a texture with or without mipmaps.
    pub(crate) fn filters(&self, mipmaps: bool) -> (u32, u32) {
        let trilinear = self.trilinear.unwrap_or(self.linear);
        let min = match (mipmaps, self.linear, trilinear) {
            (false, true, _) => gl_enums::LINEAR,
            (false, false, _) => gl_enums::NEAREST,
            (true, true, true) => gl_enums::LINEAR_MIPMAP_LINEAR,
            (true, true, false) => gl_enums::LINEAR_MIPMAP_NEAREST,
            (true, false, true) => gl_enums::NEAREST_MIPMAP_LINEAR,
            (true, false, false) => gl_enums::NEAREST_MIPMAP_NEAREST,
        };
        let mag = if self.linear {
            gl_enums::LINEAR
        } else {
            gl_enums::NEAREST
        };
        (min, mag)
    }
}
