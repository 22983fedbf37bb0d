// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Turning handle state into native objects.

Each function here binds a handle's native object and, if the handle changed since it was last
materialized, brings the native object up to date first.
*/

use crate::bindings::buffer::Buffer;
use crate::bindings::frame_buffer::{FrameBuffer, FrameBufferInfo};
use crate::bindings::texture::{Texture, TextureSource, TextureTarget, mipmaps_enabled};
use crate::images::context::ContextConfig;
use crate::images::native::NativeTable;
use crate::images::state::StateCache;
use crate::imp::{Backend, NativeId, gl_enums};
use crate::pixel_formats::Bitmap;
use logwise::privacy::LogIt;

/// Binds `buffer` to `target`, uploading its bytes if they changed.
pub(crate) fn bind_buffer<B: Backend + ?Sized>(
    backend: &mut B,
    table: &mut NativeTable,
    buffer: &Buffer,
    target: u32,
) {
    let entry = table.buffer(backend, buffer);
    backend.bind_buffer(target, entry.native);
    let (bytes, version) = buffer.snapshot();
    let mut uploaded = false;
    entry.cached.update_if_dirty(version, || {
        backend.buffer_data(target, &bytes, gl_enums::STATIC_DRAW);
        uploaded = true;
    });
    if uploaded {
        entry.estimated_bytes = bytes.len() as u64;
    }
}

/// What ended up bound by [bind_texture].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundTexture {
    pub(crate) target: TextureTarget,
    pub(crate) mipmaps: bool,
}

/// Binds `texture` to the active texture unit, uploading it if it changed.
///
/// Platform-native contents are bound as-is and never uploaded.
pub(crate) fn bind_texture<B: Backend + ?Sized>(
    backend: &mut B,
    table: &mut NativeTable,
    config: &ContextConfig,
    texture: &Texture,
) -> BoundTexture {
    let snapshot = texture.snapshot();
    if let Some(TextureSource::Single(bitmap)) = &snapshot.source {
        if let Some(native) = bitmap.native_texture() {
            backend.bind_texture(native.target.gl(), native.id);
            return BoundTexture {
                target: native.target,
                mipmaps: false,
            };
        }
    }

    let target = texture.target();
    let entry = table.texture(backend, texture);
    backend.bind_texture(target.gl(), entry.native);
    let mut uploaded = None;
    entry.cached.update_if_dirty(snapshot.version, || {
        uploaded = Some(upload_source(
            backend,
            config,
            texture,
            target,
            snapshot.source.as_ref(),
            snapshot.request_mipmaps,
        ));
    });
    if let Some((bytes, mipmaps)) = uploaded {
        entry.estimated_bytes = bytes;
        entry.mipmaps = mipmaps;
    }
    BoundTexture {
        target,
        mipmaps: entry.mipmaps,
    }
}

/// Uploads every layer of `source`.  Returns the estimated byte size and whether a mipmap chain
/// was generated.
fn upload_source<B: Backend + ?Sized>(
    backend: &mut B,
    config: &ContextConfig,
    texture: &Texture,
    target: TextureTarget,
    source: Option<&TextureSource>,
    request_mipmaps: bool,
) -> (u64, bool) {
    let Some(source) = source else {
        return (0, false);
    };
    if config.unpack_byte_swap {
        backend.pixel_store(gl_enums::UNPACK_LSB_FIRST, 1);
        backend.pixel_store(gl_enums::UNPACK_SWAP_BYTES, 1);
    }
    for (layer, bitmap) in source.layers().iter().enumerate() {
        upload_bitmap(backend, config, texture, target.layer_target(layer), bitmap);
    }
    let mipmaps = target != TextureTarget::External
        && mipmaps_enabled(request_mipmaps, source.width(), source.height());
    if mipmaps {
        backend.generate_mipmap(target.gl());
    }
    let bytes = source.width() as u64 * source.height() as u64 * source.depth() as u64 * 4;
    (bytes, mipmaps)
}

fn upload_bitmap<B: Backend + ?Sized>(
    backend: &mut B,
    config: &ContextConfig,
    texture: &Texture,
    target: u32,
    bitmap: &Bitmap,
) {
    let (internal_format, format, ty) = match bitmap {
        Bitmap::Indexed8 { .. } => (gl_enums::LUMINANCE, gl_enums::LUMINANCE, gl_enums::UNSIGNED_BYTE),
        Bitmap::Float32 { .. } => {
            let internal = if config.float_textures {
                gl_enums::RGBA32F
            } else {
                gl_enums::RGBA
            };
            (internal, gl_enums::RGBA, gl_enums::FLOAT)
        }
        Bitmap::Rgba32 { .. } | Bitmap::EmptyPlaceholder { .. } => {
            (gl_enums::RGBA, gl_enums::RGBA, gl_enums::UNSIGNED_BYTE)
        }
        Bitmap::PlatformNative { .. } => {
            logwise::warn_sync!(
                "Platform-native layer in {name} cannot be uploaded; skipping it",
                name = LogIt(texture.debug_name())
            );
            return;
        }
    };
    backend.tex_image_2d(
        target,
        0,
        internal_format,
        bitmap.width() as i32,
        bitmap.height() as i32,
        format,
        ty,
        bitmap.pixel_bytes(),
    );
}

/// Depth/stencil renderbuffer format and the attachment point it goes to.
pub(crate) fn depth_stencil_format(info: &FrameBufferInfo) -> Option<(u32, u32)> {
    match (info.has_depth, info.has_stencil) {
        (true, true) => Some((gl_enums::DEPTH_STENCIL, gl_enums::DEPTH_STENCIL_ATTACHMENT)),
        (false, true) => Some((gl_enums::STENCIL_INDEX8, gl_enums::STENCIL_ATTACHMENT)),
        (true, false) => Some((gl_enums::DEPTH_COMPONENT, gl_enums::DEPTH_ATTACHMENT)),
        (false, false) => None,
    }
}

/// Binds an offscreen `frame_buffer`, rebuilding its storage if its [FrameBufferInfo] changed.
///
/// Returns the native framebuffer.
pub(crate) fn bind_frame_buffer<B: Backend + ?Sized>(
    backend: &mut B,
    table: &mut NativeTable,
    cache: &mut StateCache,
    config: &ContextConfig,
    frame_buffer: &FrameBuffer,
) -> NativeId {
    let info = frame_buffer.info();
    let (native, renderbuffer, stale) = {
        let entry = table.frame_buffer(backend, frame_buffer.base());
        (entry.framebuffer, entry.renderbuffer, entry.info != Some(info))
    };
    if !stale {
        cache.bind_framebuffer(backend, native);
        return native;
    }
    logwise::trace_sync!(
        "Rebuilding framebuffer {id} as {info}",
        id = frame_buffer.base().id().get(),
        info = LogIt(&info)
    );

    // The color texture is set up on the scratch unit so sampler units stay intact.
    let previous_unit = cache.select_texture_unit(backend, config.scratch_texture_unit);
    let color = frame_buffer.texture();
    if (color.width(), color.height()) != (info.width, info.height) {
        color.upload(Bitmap::empty(info.width, info.height), false);
    }
    bind_texture(backend, table, config, color);
    backend.tex_parameter(gl_enums::TEXTURE_2D, gl_enums::TEXTURE_MAG_FILTER, gl_enums::LINEAR as i32);
    backend.tex_parameter(gl_enums::TEXTURE_2D, gl_enums::TEXTURE_MIN_FILTER, gl_enums::LINEAR as i32);
    let color_native = table.textures.get(&color.id()).map_or(0, |t| t.native);
    backend.bind_texture(gl_enums::TEXTURE_2D, 0);
    if let Some(unit) = previous_unit {
        cache.select_texture_unit(backend, unit);
    }

    cache.bind_framebuffer(backend, native);
    match depth_stencil_format(&info) {
        Some((format, attachment)) => {
            backend.bind_renderbuffer(gl_enums::RENDERBUFFER, renderbuffer);
            if info.samples > 1 {
                backend.renderbuffer_storage_multisample(
                    gl_enums::RENDERBUFFER,
                    info.samples as i32,
                    format,
                    info.width as i32,
                    info.height as i32,
                );
            } else {
                backend.renderbuffer_storage(
                    gl_enums::RENDERBUFFER,
                    format,
                    info.width as i32,
                    info.height as i32,
                );
            }
            backend.bind_renderbuffer(gl_enums::RENDERBUFFER, 0);
            // A single attachment point leaves the other one stale from an earlier build.
            let other = match attachment {
                gl_enums::DEPTH_ATTACHMENT => Some(gl_enums::STENCIL_ATTACHMENT),
                gl_enums::STENCIL_ATTACHMENT => Some(gl_enums::DEPTH_ATTACHMENT),
                _ => None,
            };
            if let Some(other) = other {
                backend.framebuffer_renderbuffer(gl_enums::FRAMEBUFFER, other, gl_enums::RENDERBUFFER, 0);
            }
            backend.framebuffer_renderbuffer(
                gl_enums::FRAMEBUFFER,
                attachment,
                gl_enums::RENDERBUFFER,
                renderbuffer,
            );
        }
        None => {
            backend.framebuffer_renderbuffer(
                gl_enums::FRAMEBUFFER,
                gl_enums::STENCIL_ATTACHMENT,
                gl_enums::RENDERBUFFER,
                0,
            );
            backend.framebuffer_renderbuffer(
                gl_enums::FRAMEBUFFER,
                gl_enums::DEPTH_ATTACHMENT,
                gl_enums::RENDERBUFFER,
                0,
            );
        }
    }
    backend.framebuffer_texture_2d(
        gl_enums::FRAMEBUFFER,
        gl_enums::COLOR_ATTACHMENT0,
        gl_enums::TEXTURE_2D,
        color_native,
        0,
    );
    if let Some(entry) = table.frame_buffers.get_mut(&frame_buffer.base().id()) {
        entry.info = Some(info);
    }
    native
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::recording::{Call, RecordingBackend};
    use crate::pixel_formats::{Float4, Unorm4};

    fn info(has_depth: bool, has_stencil: bool) -> FrameBufferInfo {
        FrameBufferInfo {
            width: 4,
            height: 4,
            samples: 1,
            has_depth,
            has_stencil,
        }
    }

    #[test]
    fn depth_stencil_format_table() {
        assert_eq!(
            depth_stencil_format(&info(true, true)),
            Some((gl_enums::DEPTH_STENCIL, gl_enums::DEPTH_STENCIL_ATTACHMENT))
        );
        assert_eq!(
            depth_stencil_format(&info(false, true)),
            Some((gl_enums::STENCIL_INDEX8, gl_enums::STENCIL_ATTACHMENT))
        );
        assert_eq!(
            depth_stencil_format(&info(true, false)),
            Some((gl_enums::DEPTH_COMPONENT, gl_enums::DEPTH_ATTACHMENT))
        );
        assert_eq!(depth_stencil_format(&info(false, false)), None);
    }

    #[test]
    fn texture_uploads_once_per_version() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let config = ContextConfig::default();
        let texture = Texture::new("t", TextureTarget::Texture2D);
        texture.upload(Bitmap::solid(2, 2, Unorm4::default()), false);
        bind_texture(&mut backend, &mut table, &config, &texture);
        bind_texture(&mut backend, &mut table, &config, &texture);
        assert_eq!(backend.count(|c| matches!(c, Call::TexImage2D { .. })), 1);
        texture.upload(Bitmap::solid(2, 2, Unorm4::default()), false);
        bind_texture(&mut backend, &mut table, &config, &texture);
        assert_eq!(backend.count(|c| matches!(c, Call::TexImage2D { .. })), 2);
    }

    #[test]
    fn cube_faces_upload_to_face_targets() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let texture = Texture::new("sky", TextureTarget::CubeMap);
        texture.upload_layers(vec![Bitmap::solid(1, 1, Unorm4::default()); 6], 1, 1);
        bind_texture(&mut backend, &mut table, &ContextConfig::default(), &texture);
        let targets: Vec<u32> = backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::TexImage2D { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        let expected: Vec<u32> = (0..6).map(|i| gl_enums::TEXTURE_CUBE_MAP_POSITIVE_X + i).collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn float_bitmaps_respect_float_texture_support() {
        let texture = Texture::new("f", TextureTarget::Texture2D);
        texture.upload(Bitmap::float32(1, 1, vec![Float4::RED]), false);
        for (float_textures, expected) in [(true, gl_enums::RGBA32F), (false, gl_enums::RGBA)] {
            let mut backend = RecordingBackend::new();
            let mut table = NativeTable::new();
            let config = ContextConfig {
                float_textures,
                ..ContextConfig::default()
            };
            bind_texture(&mut backend, &mut table, &config, &texture);
            assert!(backend.calls().iter().any(|c| matches!(
                c,
                Call::TexImage2D { internal_format, ty: gl_enums::FLOAT, .. } if *internal_format == expected
            )));
        }
    }

    #[test]
    fn mipmaps_only_for_power_of_two() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let config = ContextConfig::default();
        let pot = Texture::new("pot", TextureTarget::Texture2D);
        pot.upload(Bitmap::solid(4, 4, Unorm4::default()), true);
        let npot = Texture::new("npot", TextureTarget::Texture2D);
        npot.upload(Bitmap::solid(3, 4, Unorm4::default()), true);
        assert!(bind_texture(&mut backend, &mut table, &config, &pot).mipmaps);
        assert!(!bind_texture(&mut backend, &mut table, &config, &npot).mipmaps);
        assert_eq!(backend.count(|c| matches!(c, Call::GenerateMipmap(_))), 1);
    }

    #[test]
    fn byte_swap_workaround_precedes_upload() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let config = ContextConfig {
            unpack_byte_swap: true,
            ..ContextConfig::default()
        };
        let texture = Texture::new("t", TextureTarget::Texture2D);
        texture.upload(Bitmap::indexed8(1, 1, vec![7]), false);
        bind_texture(&mut backend, &mut table, &config, &texture);
        let calls = backend.calls();
        let swap = calls
            .iter()
            .position(|c| matches!(c, Call::PixelStore { parameter: gl_enums::UNPACK_SWAP_BYTES, .. }))
            .expect("swap");
        let upload = calls
            .iter()
            .position(|c| matches!(c, Call::TexImage2D { format: gl_enums::LUMINANCE, .. }))
            .expect("upload");
        assert!(swap < upload);
    }

    #[test]
    fn platform_native_is_bound_not_uploaded() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let texture = Texture::new("video", TextureTarget::Texture2D);
        texture.upload(
            Bitmap::platform_native(
                8,
                8,
                crate::pixel_formats::NativeTexture {
                    id: 42,
                    target: TextureTarget::External,
                },
            ),
            false,
        );
        let bound = bind_texture(&mut backend, &mut table, &ContextConfig::default(), &texture);
        assert_eq!(bound.target, TextureTarget::External);
        assert_eq!(
            backend.calls(),
            &[Call::BindTexture {
                target: gl_enums::TEXTURE_EXTERNAL_OES,
                texture: 42
            }]
        );
    }

    #[test]
    fn switching_to_stencil_only_detaches_depth() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let mut cache = StateCache::new();
        let config = ContextConfig::default();
        let fb = FrameBuffer::new();
        fb.set_size(4, 4);
        bind_frame_buffer(&mut backend, &mut table, &mut cache, &config, &fb);
        fb.set_extra(false, true);
        backend.clear_calls();
        bind_frame_buffer(&mut backend, &mut table, &mut cache, &config, &fb);
        assert!(backend.calls().contains(&Call::FramebufferRenderbuffer {
            attachment: gl_enums::DEPTH_ATTACHMENT,
            renderbuffer: 0
        }));
        assert!(backend.calls().iter().any(|c| matches!(
            c,
            Call::RenderbufferStorage { internal_format: gl_enums::STENCIL_INDEX8, .. }
        )));
    }

    #[test]
    fn multisampled_storage() {
        let mut backend = RecordingBackend::new();
        let mut table = NativeTable::new();
        let mut cache = StateCache::new();
        let fb = FrameBuffer::new();
        fb.set_samples(4);
        bind_frame_buffer(&mut backend, &mut table, &mut cache, &ContextConfig::default(), &fb);
        assert!(backend.calls().iter().any(|c| matches!(c, Call::RenderbufferStorage { samples: 4, .. })));
    }
}
