use accelerated_graphics::bindings::buffer::Buffer;
use accelerated_graphics::bindings::frame_buffer::FrameBuffer;
use accelerated_graphics::bindings::sampler::TextureUnit;
use accelerated_graphics::bindings::texture::{Texture, TextureTarget};
use accelerated_graphics::bindings::uniforms::{Uniform, UniformValue, UniformValues, VarType};
use accelerated_graphics::images::Context;
use accelerated_graphics::images::render_pass::{ClearCommand, DrawCommand, DrawType, ReadBuffer, ReadKind};
use accelerated_graphics::images::shader::Program;
use accelerated_graphics::images::vertex_layout::{
    VertexAttribute, VertexData, VertexFieldType, VertexLayout,
};
use accelerated_graphics::images::state::Scissor;
use accelerated_graphics::imp::gl_enums;
use accelerated_graphics::imp::recording::{Call, RecordingBackend};
use accelerated_graphics::pixel_formats::{Bitmap, Float4, Unorm4};

fn reattachments(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, Call::FramebufferTexture2D { .. }))
        .count()
}

fn bind(context: &mut Context<RecordingBackend>, target: &FrameBuffer) -> Vec<Call> {
    context.clear(&ClearCommand::new(target));
    context.backend_mut().take_calls()
}

#[test]
fn same_size_is_a_no_op() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_size(16, 16);
    assert_eq!(reattachments(&bind(&mut context, &target)), 1);

    let version = target.version();
    target.set_size(16, 16);
    assert_eq!(target.version(), version);
    let calls = bind(&mut context, &target);
    assert_eq!(reattachments(&calls), 0);
    assert!(!calls.iter().any(|c| matches!(c, Call::RenderbufferStorage { .. } | Call::TexImage2D { .. })));
}

#[test]
fn new_size_reattaches_once() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_size(16, 16);
    bind(&mut context, &target);

    target.set_size(32, 8);
    let calls = bind(&mut context, &target);
    assert_eq!(reattachments(&calls), 1);
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::TexImage2D {
            width: 32,
            height: 8,
            len: None,
            ..
        }
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::RenderbufferStorage {
            width: 32,
            height: 8,
            ..
        }
    )));
    assert!(calls.contains(&Call::Viewport {
        x: 0,
        y: 0,
        width: 32,
        height: 8
    }));
    assert!(!calls.iter().any(|c| matches!(c, Call::CreateFramebuffer(_))));
}

#[test]
fn moving_the_region_keeps_rendered_contents() {
    let mut context = Context::new(RecordingBackend::new());
    let offscreen = FrameBuffer::new();
    offscreen.set_size(4, 4);
    bind(&mut context, &offscreen);
    offscreen.set_region(0, 0, 4, 4, 8, 8);
    let calls = bind(&mut context, &offscreen);
    assert_eq!(reattachments(&calls), 0);

    let layout = VertexLayout::new().with(VertexAttribute::new("a_pos", 0, VertexFieldType::F32, 2));
    let buffer = Buffer::new("quad");
    buffer.upload_slice(&[0.0f32; 8]);
    let program = Program::for_layout("blit", "", "", &layout);
    let sampler = Uniform::new("u_source", VarType::Sampler2D);
    let screen = FrameBuffer::new();
    context
        .draw(
            &DrawCommand::new(&screen, &program, vec![VertexData::new(buffer, layout)], DrawType::TriangleStrip, 4)
                .with_uniforms(
                    UniformValues::new().with(&sampler, UniformValue::Sampler(TextureUnit::new(offscreen.texture()))),
                ),
        )
        .unwrap();
    let calls = context.backend_mut().take_calls();
    // Only the new screen target allocates a color texture; the sampled one is left alone.
    let placeholders = calls
        .iter()
        .filter(|c| matches!(c, Call::TexImage2D { len: None, .. }))
        .count();
    assert_eq!(placeholders, 1);
    assert!(!calls.iter().any(|c| matches!(
        c,
        Call::TexImage2D {
            width: 4,
            height: 4,
            ..
        }
    )));
}

#[test]
fn depth_only_target_clears_color_and_depth() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.texture().upload(Bitmap::solid(2, 2, Unorm4::default()), false);
    target.set_size(4, 4);
    target.set_extra(true, false);

    context.clear(&ClearCommand::new(&target).with_color(Float4::RED).with_depth(1.0));
    let calls = context.backend_mut().take_calls();

    let storage: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            Call::RenderbufferStorage { internal_format, .. } => Some(*internal_format),
            _ => None,
        })
        .collect();
    assert_eq!(storage, [gl_enums::DEPTH_COMPONENT]);
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::FramebufferRenderbuffer {
            attachment: gl_enums::DEPTH_ATTACHMENT,
            renderbuffer,
        } if *renderbuffer != 0
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::TexImage2D {
            width: 4,
            height: 4,
            ..
        }
    )));
    assert!(calls.contains(&Call::ClearColor {
        red: 1.0,
        green: 0.0,
        blue: 0.0,
        alpha: 1.0
    }));
    assert!(calls.contains(&Call::ClearDepth(1.0)));
    let masks: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Clear(mask) => Some(*mask),
            _ => None,
        })
        .collect();
    assert_eq!(masks, [gl_enums::COLOR_BUFFER_BIT | gl_enums::DEPTH_BUFFER_BIT]);
}

#[test]
fn depth_and_stencil_share_one_attachment() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_size(4, 4);
    let calls = bind(&mut context, &target);
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::RenderbufferStorage {
            internal_format: gl_enums::DEPTH_STENCIL,
            samples: 1,
            ..
        }
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::FramebufferRenderbuffer {
            attachment: gl_enums::DEPTH_STENCIL_ATTACHMENT,
            ..
        }
    )));
}

#[test]
fn switching_to_stencil_only_detaches_depth() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_extra(true, false);
    bind(&mut context, &target);
    target.set_extra(false, true);
    let calls = bind(&mut context, &target);
    assert!(calls.contains(&Call::FramebufferRenderbuffer {
        attachment: gl_enums::DEPTH_ATTACHMENT,
        renderbuffer: 0
    }));
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::RenderbufferStorage {
            internal_format: gl_enums::STENCIL_INDEX8,
            ..
        }
    )));
}

#[test]
fn no_extras_detaches_everything() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_extra(false, false);
    let calls = bind(&mut context, &target);
    assert!(!calls.iter().any(|c| matches!(c, Call::RenderbufferStorage { .. })));
    assert!(calls.contains(&Call::FramebufferRenderbuffer {
        attachment: gl_enums::DEPTH_ATTACHMENT,
        renderbuffer: 0
    }));
    assert!(calls.contains(&Call::FramebufferRenderbuffer {
        attachment: gl_enums::STENCIL_ATTACHMENT,
        renderbuffer: 0
    }));
}

#[test]
fn samples_select_multisample_storage() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_samples(4);
    let calls = bind(&mut context, &target);
    assert!(calls.iter().any(|c| matches!(c, Call::RenderbufferStorage { samples: 4, .. })));
}

#[test]
fn rebuild_leaves_sampler_units_alone() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let calls = bind(&mut context, &target);
    let units: Vec<u32> = calls
        .iter()
        .filter_map(|c| match c {
            Call::ActiveTexture(unit) => Some(*unit),
            _ => None,
        })
        .collect();
    assert_eq!(units, [gl_enums::TEXTURE0 + 7]);
}

#[test]
fn main_frame_buffer_uses_the_captured_binding() {
    let mut backend = RecordingBackend::new();
    backend.set_surface_framebuffer(42);
    let mut context = Context::new(backend);
    context.start_frame();
    let offscreen = FrameBuffer::new();
    let main = FrameBuffer::main();
    bind(&mut context, &offscreen);
    let calls = bind(&mut context, &main);
    assert!(calls.contains(&Call::BindFramebuffer(42)));
    assert!(!calls.iter().any(|c| matches!(c, Call::CreateFramebuffer(_))));

    bind(&mut context, &offscreen);
    context.end_frame();
    assert_eq!(context.backend().calls(), [Call::BindFramebuffer(42)]);
}

#[test]
fn clear_forces_write_masks() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    context.clear(
        &ClearCommand::new(&target)
            .with_color(Float4::BLACK)
            .with_depth(1.0)
            .with_stencil(0)
            .with_scissor(Scissor::new(0, 0, 2, 2)),
    );
    let calls = context.backend_mut().take_calls();
    assert!(calls.contains(&Call::ColorMask {
        red: true,
        green: true,
        blue: true,
        alpha: true
    }));
    assert!(calls.contains(&Call::DepthMask(true)));
    assert!(calls.contains(&Call::StencilMask(u32::MAX)));
    assert!(calls.contains(&Call::Enable(gl_enums::SCISSOR_TEST)));
    assert!(calls.contains(&Call::Clear(
        gl_enums::COLOR_BUFFER_BIT | gl_enums::DEPTH_BUFFER_BIT | gl_enums::STENCIL_BUFFER_BIT
    )));
}

#[test]
fn read_color_into_ints() {
    let mut backend = RecordingBackend::new();
    backend.set_read_fill(0xAB);
    let mut context = Context::new(backend);
    let target = FrameBuffer::new();
    let mut pixels = [0u32; 6];
    context.read_to_memory(&target, ReadKind::Color, 1, 2, 2, 2, ReadBuffer::Int(&mut pixels));
    assert_eq!(&pixels[..4], [0xABABABAB; 4]);
    assert_eq!(&pixels[4..], [0; 2]);
    assert!(context.backend().calls().contains(&Call::ReadPixels {
        x: 1,
        y: 2,
        width: 2,
        height: 2,
        format: gl_enums::RGBA,
        ty: gl_enums::UNSIGNED_BYTE
    }));
}

#[test]
fn read_depth_and_stencil() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let mut depth = [1.0f32; 4];
    context.read_to_memory(&target, ReadKind::Depth, 0, 0, 2, 2, ReadBuffer::Float(&mut depth));
    assert_eq!(depth, [0.0; 4]);
    let mut stencil = [9u8; 4];
    context.read_to_memory(&target, ReadKind::Stencil, 0, 0, 2, 2, ReadBuffer::Byte(&mut stencil));
    assert_eq!(stencil, [0; 4]);
    let formats: Vec<(u32, u32)> = context
        .backend()
        .calls()
        .iter()
        .filter_map(|c| match c {
            Call::ReadPixels { format, ty, .. } => Some((*format, *ty)),
            _ => None,
        })
        .collect();
    assert_eq!(
        formats,
        [
            (gl_enums::DEPTH_COMPONENT, gl_enums::FLOAT),
            (gl_enums::STENCIL_INDEX, gl_enums::UNSIGNED_BYTE)
        ]
    );
}

#[test]
#[should_panic]
fn depth_into_ints_panics() {
    let mut context = Context::new(RecordingBackend::new());
    let mut pixels = [0u32; 4];
    context.read_to_memory(&FrameBuffer::new(), ReadKind::Depth, 0, 0, 2, 2, ReadBuffer::Int(&mut pixels));
}

#[test]
#[should_panic]
fn undersized_storage_panics() {
    let mut context = Context::new(RecordingBackend::new());
    let mut pixels = [0u32; 3];
    context.read_to_memory(&FrameBuffer::new(), ReadKind::Color, 0, 0, 2, 2, ReadBuffer::Int(&mut pixels));
}

#[test]
fn read_to_texture_resizes_the_destination() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_size(8, 8);
    let copy = Texture::new("copy", TextureTarget::Texture2D);
    copy.upload(Bitmap::solid(2, 2, Unorm4::default()), false);
    context.read_to_texture(&target, &copy, 2, 2, 4, 4);
    assert_eq!((copy.width(), copy.height()), (4, 4));
    let calls = context.backend_mut().take_calls();
    assert!(calls.contains(&Call::CopyTexImage2D {
        target: gl_enums::TEXTURE_2D,
        internal_format: gl_enums::RGBA,
        x: 2,
        y: 2,
        width: 4,
        height: 4
    }));

    let version = copy.version();
    context.read_to_texture(&target, &copy, 0, 0, 4, 4);
    assert_eq!(copy.version(), version);
}
