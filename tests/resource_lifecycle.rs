use accelerated_graphics::bindings::buffer::Buffer;
use accelerated_graphics::bindings::frame_buffer::FrameBuffer;
use accelerated_graphics::bindings::sampler::TextureUnit;
use accelerated_graphics::bindings::texture::{Texture, TextureTarget};
use accelerated_graphics::bindings::uniforms::{Uniform, UniformValue, UniformValues, VarType};
use accelerated_graphics::images::Context;
use accelerated_graphics::images::render_pass::{DrawCommand, DrawType};
use accelerated_graphics::images::shader::Program;
use accelerated_graphics::images::vertex_layout::{
    VertexAttribute, VertexData, VertexFieldType, VertexLayout,
};
use accelerated_graphics::imp::recording::{Call, RecordingBackend};
use accelerated_graphics::pixel_formats::{Bitmap, Unorm4};

fn layout() -> VertexLayout {
    VertexLayout::new().with(VertexAttribute::new("a_pos", 0, VertexFieldType::F32, 2))
}

fn draw(target: &FrameBuffer, program: &Program, buffer: &Buffer, uniforms: UniformValues) -> DrawCommand {
    DrawCommand::new(
        target,
        program,
        vec![VertexData::new(buffer.clone(), layout())],
        DrawType::Triangles,
        3,
    )
    .with_uniforms(uniforms)
}

fn count(calls: &[Call], predicate: impl Fn(&Call) -> bool) -> usize {
    calls.iter().filter(|c| predicate(c)).count()
}

#[test]
fn versions_count_uploads() {
    let buffer = Buffer::new("b");
    assert_eq!(buffer.version(), 0);
    for n in 1..=3u64 {
        buffer.upload_slice(&[n as f32; 6]);
        assert_eq!(buffer.version(), n);
    }
    let texture = Texture::new("t", TextureTarget::Texture2D);
    texture.upload(Bitmap::solid(1, 1, Unorm4::default()), false);
    texture.upload(Bitmap::solid(2, 2, Unorm4::default()), false);
    assert_eq!(texture.version(), 2);
}

#[test]
fn unchanged_handles_rematerialize_with_no_calls() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_size(8, 8);
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    let texture = Texture::new("t", TextureTarget::Texture2D);
    texture.upload(Bitmap::solid(2, 2, Unorm4::default()), false);
    let sampler = Uniform::new("u_t", VarType::Sampler2D);
    let uniforms = UniformValues::new().with(&sampler, UniformValue::Sampler(TextureUnit::new(&texture)));

    context.draw(&draw(&target, &program, &buffer, uniforms.clone())).unwrap();
    let first = context.backend_mut().take_calls();
    assert_eq!(count(&first, |c| matches!(c, Call::BufferData { .. })), 1);
    assert_eq!(count(&first, |c| matches!(c, Call::TexImage2D { width: 2, .. })), 1);

    context.draw(&draw(&target, &program, &buffer, uniforms.clone())).unwrap();
    let second = context.backend_mut().take_calls();
    assert_eq!(count(&second, |c| matches!(c, Call::BufferData { .. })), 0);
    assert_eq!(count(&second, |c| matches!(c, Call::TexImage2D { .. })), 0);
    assert_eq!(count(&second, |c| matches!(c, Call::CreateBuffer(_) | Call::CreateTexture(_))), 0);

    buffer.upload_slice(&[1.0f32; 6]);
    context.draw(&draw(&target, &program, &buffer, uniforms)).unwrap();
    let third = context.backend_mut().take_calls();
    assert_eq!(count(&third, |c| matches!(c, Call::BufferData { len: 24, .. })), 1);
    assert_eq!(count(&third, |c| matches!(c, Call::TexImage2D { .. })), 0);
}

#[test]
fn close_twice_deletes_once_after_finish() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    context.draw(&draw(&target, &program, &buffer, UniformValues::new())).unwrap();
    context.backend_mut().clear_calls();

    buffer.close();
    buffer.close();
    assert_eq!(context.stats().pending_deletions, 1);
    assert_eq!(context.backend().count(|c| matches!(c, Call::DeleteBuffer(_))), 0);

    context.finish();
    assert_eq!(context.backend().count(|c| matches!(c, Call::DeleteBuffer(_))), 1);
    assert_eq!(context.stats().buffers, 0);
    assert_eq!(context.stats().pending_deletions, 0);

    context.finish();
    assert_eq!(context.backend().count(|c| matches!(c, Call::DeleteBuffer(_))), 1);
}

#[test]
fn dropping_the_last_handle_defers_deletion() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    let command = draw(&target, &program, &buffer, UniformValues::new());
    context.draw(&command).unwrap();
    drop(command);
    drop(buffer);
    assert_eq!(context.stats().pending_deletions, 1);
    context.finish();
    assert_eq!(context.backend().count(|c| matches!(c, Call::DeleteBuffer(_))), 1);
}

#[test]
fn closing_unused_handles_touches_nothing() {
    let mut context = Context::new(RecordingBackend::new());
    let texture = Texture::new("never drawn", TextureTarget::Texture2D);
    texture.close();
    context.finish();
    assert_eq!(context.backend().calls(), [Call::Flush]);
}

#[test]
fn closing_a_frame_buffer_releases_its_native_objects() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    context.clear(&accelerated_graphics::images::render_pass::ClearCommand::new(&target));
    target.close();
    context.finish();
    let calls = context.backend().calls();
    assert_eq!(count(calls, |c| matches!(c, Call::DeleteFramebuffer(_))), 1);
    assert_eq!(count(calls, |c| matches!(c, Call::DeleteRenderbuffer(_))), 1);
    assert_eq!(count(calls, |c| matches!(c, Call::DeleteTexture(_))), 1);
}

#[test]
fn closing_a_program_deletes_every_variant() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    let video = Texture::new("video", TextureTarget::Texture2D);
    video.upload(
        Bitmap::platform_native(
            4,
            4,
            accelerated_graphics::pixel_formats::NativeTexture {
                id: 77,
                target: TextureTarget::External,
            },
        ),
        false,
    );
    let sampler = Uniform::new("u_video", VarType::Sampler2D);
    context.draw(&draw(&target, &program, &buffer, UniformValues::new())).unwrap();
    context
        .draw(&draw(
            &target,
            &program,
            &buffer,
            UniformValues::new().with(&sampler, UniformValue::Sampler(TextureUnit::new(&video))),
        ))
        .unwrap();
    assert_eq!(context.stats().programs, 2);

    program.close();
    context.finish();
    assert_eq!(context.backend().count(|c| matches!(c, Call::DeleteProgram(_))), 2);
    assert_eq!(context.stats().programs, 0);
}

#[test]
fn context_loss_rematerializes_without_deleting() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    context.draw(&draw(&target, &program, &buffer, UniformValues::new())).unwrap();
    context.backend_mut().clear_calls();

    context.context_lost();
    assert_eq!(context.stats().buffers, 0);
    assert_eq!(context.stats().programs, 0);
    context.start_frame();
    context.draw(&draw(&target, &program, &buffer, UniformValues::new())).unwrap();
    let calls = context.backend_mut().take_calls();
    assert_eq!(count(&calls, |c| matches!(c, Call::CreateBuffer(_))), 1);
    assert_eq!(count(&calls, |c| matches!(c, Call::BufferData { .. })), 1);
    assert_eq!(count(&calls, |c| matches!(c, Call::CreateFramebuffer(_))), 1);
    assert_eq!(count(&calls, |c| matches!(c, Call::LinkProgram(_))), 1);
    assert_eq!(
        count(&calls, |c| matches!(
            c,
            Call::DeleteBuffer(_) | Call::DeleteTexture(_) | Call::DeleteProgram(_) | Call::DeleteFramebuffer(_)
        )),
        0
    );
}

#[test]
fn stats_track_live_objects_and_bytes() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    target.set_size(4, 4);
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    let texture = Texture::new("t", TextureTarget::Texture2D);
    texture.upload(Bitmap::solid(2, 2, Unorm4::default()), false);
    let sampler = Uniform::new("u_t", VarType::Sampler2D);
    let uniforms = UniformValues::new().with(&sampler, UniformValue::Sampler(TextureUnit::new(&texture)));
    context.draw(&draw(&target, &program, &buffer, uniforms)).unwrap();

    let stats = context.stats();
    assert_eq!(stats.buffers, 1);
    // The sampled texture plus the framebuffer's color texture.
    assert_eq!(stats.textures, 2);
    assert_eq!(stats.frame_buffers, 1);
    assert_eq!(stats.programs, 1);
    assert_eq!(stats.buffer_bytes, 24);
    assert_eq!(stats.texture_bytes, 2 * 2 * 4 + 4 * 4 * 4);
    assert_eq!(stats.pending_deletions, 0);
}

#[test]
fn closing_from_another_thread_is_drained_by_the_context() {
    let mut context = Context::new(RecordingBackend::new());
    let target = FrameBuffer::new();
    let program = Program::for_layout("p", "", "", &layout());
    let buffer = Buffer::new("vertices");
    buffer.upload_slice(&[0.0f32; 6]);
    context.draw(&draw(&target, &program, &buffer, UniformValues::new())).unwrap();

    let remote = buffer.clone();
    std::thread::spawn(move || remote.close()).join().unwrap();
    context.finish();
    assert_eq!(context.backend().count(|c| matches!(c, Call::DeleteBuffer(_))), 1);
}
