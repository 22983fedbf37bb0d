// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Texture handles.

A [Texture] owns at most one logical image: either a single [Bitmap] or, for cube maps, one
bitmap per face.  Width, height and depth are always derived from that image.

```
use accelerated_graphics::bindings::texture::{Texture, TextureTarget};
use accelerated_graphics::pixel_formats::{Bitmap, Unorm4};

let texture = Texture::new("sprite", TextureTarget::Texture2D);
assert_eq!(texture.width(), 0);
texture.upload(Bitmap::solid(4, 2, Unorm4::default()), true);
assert_eq!((texture.width(), texture.height(), texture.depth()), (4, 2, 1));
assert_eq!(texture.estimated_memory(), 4 * 2 * 4);
```
*/

use crate::bindings::resource::{ResourceCore, ResourceId};
use crate::imp::gl_enums;
use crate::pixel_formats::Bitmap;
use logwise::privacy::LogIt;
use std::sync::Arc;
use wasm_safe_mutex::Mutex;

/// The kind of native texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
    /// An externally produced image (`samplerExternalOES`).
    External,
}

impl TextureTarget {
    pub(crate) fn gl(self) -> u32 {
        match self {
            TextureTarget::Texture2D => gl_enums::TEXTURE_2D,
            TextureTarget::CubeMap => gl_enums::TEXTURE_CUBE_MAP,
            TextureTarget::External => gl_enums::TEXTURE_EXTERNAL_OES,
        }
    }

    /// Number of wrap axes.
    pub fn dims(self) -> u8 {
        match self {
            TextureTarget::Texture2D | TextureTarget::External => 2,
            TextureTarget::CubeMap => 3,
        }
    }

    /// Upload target for layer `layer`.
    pub(crate) fn layer_target(self, layer: usize) -> u32 {
        match self {
            TextureTarget::CubeMap => gl_enums::TEXTURE_CUBE_MAP_POSITIVE_X + layer as u32,
            TextureTarget::Texture2D | TextureTarget::External => self.gl(),
        }
    }
}

/// The logical contents of a texture.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    Single(Bitmap),
    /// One bitmap per layer, such as the six faces of a cube map.
    Layers {
        width: u32,
        height: u32,
        layers: Vec<Bitmap>,
    },
}

impl TextureSource {
    pub fn width(&self) -> u32 {
        match self {
            TextureSource::Single(b) => b.width(),
            TextureSource::Layers { width, .. } => *width,
        }
    }
    pub fn height(&self) -> u32 {
        match self {
            TextureSource::Single(b) => b.height(),
            TextureSource::Layers { height, .. } => *height,
        }
    }
    pub fn depth(&self) -> u32 {
        match self {
            TextureSource::Single(_) => 1,
            TextureSource::Layers { layers, .. } => layers.len() as u32,
        }
    }
    pub fn layers(&self) -> &[Bitmap] {
        match self {
            TextureSource::Single(b) => std::slice::from_ref(b),
            TextureSource::Layers { layers, .. } => layers,
        }
    }
}

#[derive(Debug)]
struct TextureState {
    source: Option<TextureSource>,
    request_mipmaps: bool,
    version: u64,
}

#[derive(Debug)]
struct Shared {
    core: ResourceCore,
    debug_name: String,
    target: TextureTarget,
    premultiplied: bool,
    is_fbo: bool,
    state: Mutex<TextureState>,
}

/// A versioned texture.  Clones share the same underlying resource.
#[derive(Debug, Clone)]
pub struct Texture {
    shared: Arc<Shared>,
}

/// What the context needs to materialize one version of a texture.
#[derive(Debug, Clone)]
pub(crate) struct TextureSnapshot {
    pub(crate) source: Option<TextureSource>,
    pub(crate) request_mipmaps: bool,
    pub(crate) version: u64,
}

impl Texture {
    /// A premultiplied texture.
    pub fn new(debug_name: &str, target: TextureTarget) -> Self {
        Self::with_alpha(debug_name, target, true)
    }

    /// A texture whose premultiplied flag is fixed to `premultiplied`.
    pub fn with_alpha(debug_name: &str, target: TextureTarget, premultiplied: bool) -> Self {
        Self::build(debug_name, target, premultiplied, false)
    }

    pub(crate) fn new_frame_buffer_color(debug_name: &str) -> Self {
        Self::build(debug_name, TextureTarget::Texture2D, true, true)
    }

    fn build(debug_name: &str, target: TextureTarget, premultiplied: bool, is_fbo: bool) -> Self {
        Texture {
            shared: Arc::new(Shared {
                core: ResourceCore::new(),
                debug_name: debug_name.to_string(),
                target,
                premultiplied,
                is_fbo,
                state: Mutex::new(TextureState {
                    source: None,
                    request_mipmaps: false,
                    version: 0,
                }),
            }),
        }
    }

    fn check_premultiplied(&self, bitmap: &Bitmap) {
        if !bitmap.is_premultiplied() {
            logwise::warn_sync!(
                "Uploading a non-premultiplied bitmap to {name}; this will cause rendering artifacts",
                name = LogIt(&self.shared.debug_name)
            );
        }
    }

    /// Replaces the contents with `bitmap`.
    ///
    /// Mipmaps are generated on materialization when `mipmaps` is set and both dimensions are
    /// powers of two.
    pub fn upload(&self, bitmap: Bitmap, mipmaps: bool) {
        self.check_premultiplied(&bitmap);
        self.replace(Some(TextureSource::Single(bitmap)), mipmaps);
    }

    /// Replaces the contents with one bitmap per layer.
    pub fn upload_layers(&self, layers: Vec<Bitmap>, width: u32, height: u32) {
        for layer in &layers {
            self.check_premultiplied(layer);
        }
        self.replace(
            Some(TextureSource::Layers {
                width,
                height,
                layers,
            }),
            false,
        );
    }

    /// Drops the contents.  The native texture stays allocated until the next upload or close.
    pub fn clear_contents(&self) {
        self.replace(None, false);
    }

    fn replace(&self, source: Option<TextureSource>, mipmaps: bool) {
        let mut state = self.shared.state.lock_sync();
        state.source = source;
        state.request_mipmaps = mipmaps;
        state.version += 1;
    }

    pub fn id(&self) -> ResourceId {
        self.shared.core.id()
    }

    pub fn debug_name(&self) -> &str {
        &self.shared.debug_name
    }

    pub fn target(&self) -> TextureTarget {
        self.shared.target
    }

    /// The target the texture is actually bound to; platform-native contents bring their own.
    pub fn bind_target(&self) -> TextureTarget {
        let state = self.shared.state.lock_sync();
        match &state.source {
            Some(TextureSource::Single(bitmap)) => bitmap
                .native_texture()
                .map_or(self.shared.target, |n| n.target),
            _ => self.shared.target,
        }
    }

    pub fn premultiplied(&self) -> bool {
        self.shared.premultiplied
    }

    /// Whether this texture is the color attachment of a framebuffer.
    pub fn is_fbo(&self) -> bool {
        self.shared.is_fbo
    }

    pub fn request_mipmaps(&self) -> bool {
        self.shared.state.lock_sync().request_mipmaps
    }

    pub fn width(&self) -> u32 {
        self.shared
            .state
            .lock_sync()
            .source
            .as_ref()
            .map_or(0, TextureSource::width)
    }

    pub fn height(&self) -> u32 {
        self.shared
            .state
            .lock_sync()
            .source
            .as_ref()
            .map_or(0, TextureSource::height)
    }

    pub fn depth(&self) -> u32 {
        self.shared
            .state
            .lock_sync()
            .source
            .as_ref()
            .map_or(1, TextureSource::depth)
    }

    /// `width * height * depth * 4` bytes.
    pub fn estimated_memory(&self) -> u64 {
        self.width() as u64 * self.height() as u64 * self.depth() as u64 * 4
    }

    pub fn version(&self) -> u64 {
        self.shared.state.lock_sync().version
    }

    /// Releases the native texture in every context that created one.  Safe to call repeatedly.
    pub fn close(&self) {
        self.shared.core.close();
    }

    pub(crate) fn core(&self) -> &ResourceCore {
        &self.shared.core
    }

    pub(crate) fn snapshot(&self) -> TextureSnapshot {
        let state = self.shared.state.lock_sync();
        TextureSnapshot {
            source: state.source.clone(),
            request_mipmaps: state.request_mipmaps,
            version: state.version,
        }
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Texture {}

/// Whether a texture with this geometry gets a mipmap chain.
pub(crate) fn mipmaps_enabled(request: bool, width: u32, height: u32) -> bool {
    request && width.is_power_of_two() && height.is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::{NativeTexture, Unorm4};

    #[test]
    fn dimensions_are_derived() {
        let t = Texture::new("t", TextureTarget::CubeMap);
        let face = Bitmap::solid(8, 8, Unorm4::default());
        t.upload_layers(vec![face; 6], 8, 8);
        assert_eq!((t.width(), t.height(), t.depth()), (8, 8, 6));
        assert_eq!(t.estimated_memory(), 8 * 8 * 6 * 4);
        assert_eq!(t.version(), 1);
    }

    #[test]
    fn mipmaps_need_power_of_two() {
        assert!(mipmaps_enabled(true, 64, 32));
        assert!(!mipmaps_enabled(true, 64, 30));
        assert!(!mipmaps_enabled(false, 64, 64));
    }

    #[test]
    fn cube_faces_have_consecutive_targets() {
        assert_eq!(
            TextureTarget::CubeMap.layer_target(5),
            gl_enums::TEXTURE_CUBE_MAP_POSITIVE_X + 5
        );
        assert_eq!(TextureTarget::Texture2D.layer_target(0), gl_enums::TEXTURE_2D);
    }

    #[test]
    fn platform_native_overrides_bind_target() {
        let t = Texture::new("video", TextureTarget::Texture2D);
        t.upload(
            Bitmap::platform_native(
                16,
                16,
                NativeTexture {
                    id: 77,
                    target: TextureTarget::External,
                },
            ),
            false,
        );
        assert_eq!(t.bind_target(), TextureTarget::External);
        assert_eq!(t.target(), TextureTarget::Texture2D);
    }

    #[test]
    fn straight_alpha_upload_still_applies() {
        let t = Texture::new("t", TextureTarget::Texture2D);
        t.upload(Bitmap::rgba32(1, 1, vec![Unorm4::default()], false), false);
        assert_eq!(t.version(), 1);
        assert_eq!(t.width(), 1);
    }
}
