use accelerated_graphics::bindings::frame_buffer::FrameBuffer;
use accelerated_graphics::images::render_pass::ClearCommand;
use accelerated_graphics::images::{Context, ContextConfig, ThreadPolicy};
use accelerated_graphics::imp::recording::{Call, RecordingBackend};
use accelerated_graphics::pixel_formats::Float4;

fn context(policy: ThreadPolicy) -> Context<RecordingBackend> {
    Context::with_config(
        RecordingBackend::new(),
        ContextConfig {
            thread_policy: policy,
            ..ContextConfig::default()
        },
    )
}

#[test]
fn moving_to_a_render_thread_before_first_use_is_fine() {
    let mut context = context(ThreadPolicy::Panic);
    let target = FrameBuffer::new();
    let context = std::thread::spawn(move || {
        context.start_frame();
        context.clear(&ClearCommand::new(&target).with_color(Float4::BLACK));
        context.end_frame();
        context
    })
    .join()
    .expect("render thread");
    assert!(context.backend().calls().iter().any(|c| matches!(c, Call::Clear(_))));
}

#[test]
fn driving_from_a_second_thread_panics() {
    let mut context = context(ThreadPolicy::Panic);
    context.start_frame();
    let result = std::thread::spawn(move || {
        context.clear(&ClearCommand::new(&FrameBuffer::new()).with_color(Float4::BLACK));
    })
    .join();
    assert!(result.is_err());
}

#[test]
fn report_policy_logs_and_continues() {
    let mut context = context(ThreadPolicy::Report);
    context.start_frame();
    let context = std::thread::spawn(move || {
        context.clear(&ClearCommand::new(&FrameBuffer::new()).with_color(Float4::BLACK));
        context
    })
    .join()
    .expect("report policy does not panic");
    assert_eq!(context.backend().count(|c| matches!(c, Call::Clear(_))), 1);
}

#[test]
fn handles_close_from_any_thread() {
    let mut context = context(ThreadPolicy::Panic);
    let target = FrameBuffer::new();
    context.clear(&ClearCommand::new(&target));
    let closer = target.clone();
    std::thread::spawn(move || closer.close()).join().expect("close");
    context.finish();
    assert_eq!(
        context
            .backend()
            .count(|c| matches!(c, Call::DeleteFramebuffer(_))),
        1
    );
}
