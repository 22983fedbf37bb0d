// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Render state values and the cache of what the backend currently has applied.

Each state value has a sentinel that means "this feature is off": [Scissor::NIL],
[Blending::NONE], [StencilOpFunc::DISABLED], a depth compare of [CompareMode::Always] and
[CullFace::None].  Enable/disable calls are derived from comparing against the sentinel, so there
is no separate flag that could disagree with the value.

The [StateCache] remembers every value it has sent to the backend and only forwards changes.
Each native call is cached on its own, so changing one field of a state value issues only the
call that field belongs to.
*/

use crate::imp::{Backend, NativeId, gl_enums};

/// A scissor rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scissor {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Scissor {
    /// No scissor test.
    pub const NIL: Scissor = Scissor {
        x: 0,
        y: 0,
        width: -1,
        height: -1,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Scissor {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_nil(self) -> bool {
        self == Scissor::NIL
    }
}

impl Default for Scissor {
    fn default() -> Self {
        Scissor::NIL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    DstColor,
    OneMinusDstColor,
}

impl BlendFactor {
    fn gl(self) -> u32 {
        match self {
            BlendFactor::Zero => gl_enums::ZERO,
            BlendFactor::One => gl_enums::ONE,
            BlendFactor::SrcColor => gl_enums::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => gl_enums::ONE_MINUS_SRC_COLOR,
            BlendFactor::SrcAlpha => gl_enums::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => gl_enums::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstAlpha => gl_enums::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => gl_enums::ONE_MINUS_DST_ALPHA,
            BlendFactor::DstColor => gl_enums::DST_COLOR,
            BlendFactor::OneMinusDstColor => gl_enums::ONE_MINUS_DST_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
}

impl BlendEquation {
    fn gl(self) -> u32 {
        match self {
            BlendEquation::Add => gl_enums::FUNC_ADD,
            BlendEquation::Subtract => gl_enums::FUNC_SUBTRACT,
            BlendEquation::ReverseSubtract => gl_enums::FUNC_REVERSE_SUBTRACT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blending {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub eq_rgb: BlendEquation,
    pub eq_alpha: BlendEquation,
}

impl Blending {
    /// Source replaces destination; blending is disabled.
    pub const NONE: Blending = Blending::separate(
        BlendFactor::One,
        BlendFactor::Zero,
        BlendFactor::One,
        BlendFactor::Zero,
    );
    /// Premultiplied-alpha "over".
    pub const NORMAL: Blending = Blending::separate(
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
    );
    pub const ADD: Blending = Blending::separate(
        BlendFactor::One,
        BlendFactor::One,
        BlendFactor::One,
        BlendFactor::One,
    );

    pub const fn separate(
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Self {
        Blending {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
            eq_rgb: BlendEquation::Add,
            eq_alpha: BlendEquation::Add,
        }
    }

    pub const fn with_equations(mut self, eq_rgb: BlendEquation, eq_alpha: BlendEquation) -> Self {
        self.eq_rgb = eq_rgb;
        self.eq_alpha = eq_alpha;
        self
    }

    pub fn enabled(&self) -> bool {
        *self != Blending::NONE
    }
}

impl Default for Blending {
    fn default() -> Self {
        Blending::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareMode {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareMode {
    fn gl(self) -> u32 {
        match self {
            CompareMode::Never => gl_enums::NEVER,
            CompareMode::Less => gl_enums::LESS,
            CompareMode::Equal => gl_enums::EQUAL,
            CompareMode::LessEqual => gl_enums::LEQUAL,
            CompareMode::Greater => gl_enums::GREATER,
            CompareMode::NotEqual => gl_enums::NOTEQUAL,
            CompareMode::GreaterEqual => gl_enums::GEQUAL,
            CompareMode::Always => gl_enums::ALWAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

impl StencilOp {
    fn gl(self) -> u32 {
        match self {
            StencilOp::Keep => gl_enums::KEEP,
            StencilOp::Zero => gl_enums::ZERO,
            StencilOp::Replace => gl_enums::REPLACE,
            StencilOp::Increment => gl_enums::INCR,
            StencilOp::Decrement => gl_enums::DECR,
            StencilOp::Invert => gl_enums::INVERT,
            StencilOp::IncrementWrap => gl_enums::INCR_WRAP,
            StencilOp::DecrementWrap => gl_enums::DECR_WRAP,
        }
    }
}

/// The stencil test and what it does to the stencil buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilOpFunc {
    pub compare: CompareMode,
    pub on_stencil_fail: StencilOp,
    pub on_depth_fail: StencilOp,
    pub on_pass: StencilOp,
}

impl StencilOpFunc {
    pub const DISABLED: StencilOpFunc = StencilOpFunc {
        compare: CompareMode::Always,
        on_stencil_fail: StencilOp::Keep,
        on_depth_fail: StencilOp::Keep,
        on_pass: StencilOp::Keep,
    };

    pub fn enabled(&self) -> bool {
        *self != StencilOpFunc::DISABLED
    }
}

impl Default for StencilOpFunc {
    fn default() -> Self {
        StencilOpFunc::DISABLED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilReference {
    pub reference: i32,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl StencilReference {
    pub const DEFAULT: StencilReference = StencilReference {
        reference: 0,
        read_mask: 0xFF,
        write_mask: 0xFF,
    };
}

impl Default for StencilReference {
    fn default() -> Self {
        StencilReference::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl ColorMask {
    pub const ALL_ENABLED: ColorMask = ColorMask {
        red: true,
        green: true,
        blue: true,
        alpha: true,
    };
    pub const ALL_DISABLED: ColorMask = ColorMask {
        red: false,
        green: false,
        blue: false,
        alpha: false,
    };
}

impl Default for ColorMask {
    fn default() -> Self {
        ColorMask::ALL_ENABLED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

impl FrontFace {
    fn gl(self) -> u32 {
        match self {
            FrontFace::CounterClockwise => gl_enums::CCW,
            FrontFace::Clockwise => gl_enums::CW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    #[default]
    None,
    Front,
    Back,
    FrontAndBack,
}

impl CullFace {
    fn gl(self) -> Option<u32> {
        match self {
            CullFace::None => None,
            CullFace::Front => Some(gl_enums::FRONT),
            CullFace::Back => Some(gl_enums::BACK),
            CullFace::FrontAndBack => Some(gl_enums::FRONT_AND_BACK),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAndFrontFace {
    pub front_face: FrontFace,
    pub depth_mask: bool,
    pub depth_near: f32,
    pub depth_far: f32,
    /// [CompareMode::Always] disables the depth test.
    pub depth_func: CompareMode,
}

impl DepthAndFrontFace {
    pub const DEFAULT: DepthAndFrontFace = DepthAndFrontFace {
        front_face: FrontFace::CounterClockwise,
        depth_mask: true,
        depth_near: 0.0,
        depth_far: 1.0,
        depth_func: CompareMode::Always,
    };
}

impl Default for DepthAndFrontFace {
    fn default() -> Self {
        DepthAndFrontFace::DEFAULT
    }
}

/// Native state as last applied through this cache.  `None` means unknown.
#[derive(Debug, Default)]
pub struct StateCache {
    // capabilities
    scissor_test: Option<bool>,
    blend: Option<bool>,
    stencil_test: Option<bool>,
    depth_test: Option<bool>,
    cull: Option<bool>,

    scissor: Option<Scissor>,
    blend_equation: Option<(BlendEquation, BlendEquation)>,
    blend_func: Option<(BlendFactor, BlendFactor, BlendFactor, BlendFactor)>,
    stencil_func: Option<(CompareMode, i32, u32)>,
    stencil_op: Option<(StencilOp, StencilOp, StencilOp)>,
    stencil_write_mask: Option<u32>,
    color_mask: Option<ColorMask>,
    front_face: Option<FrontFace>,
    cull_face: Option<u32>,
    depth_mask: Option<bool>,
    depth_range: Option<(u32, u32)>,
    depth_func: Option<CompareMode>,

    active_texture_unit: Option<u32>,
    program: Option<NativeId>,
    framebuffer: Option<NativeId>,
    viewport: Option<(u32, u32)>,
}

fn set_capability<B: Backend + ?Sized>(
    backend: &mut B,
    slot: &mut Option<bool>,
    capability: u32,
    enabled: bool,
) {
    if *slot == Some(enabled) {
        return;
    }
    if enabled {
        backend.enable(capability);
    } else {
        backend.disable(capability);
    }
    *slot = Some(enabled);
}

/// Stores `value` in `slot` and returns whether it differed.
fn changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        false
    } else {
        *slot = Some(value);
        true
    }
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything; the next request for each piece of state is always sent.
    pub fn invalidate(&mut self) {
        *self = StateCache::default();
    }

    pub fn apply_scissor<B: Backend + ?Sized>(&mut self, backend: &mut B, scissor: Scissor) {
        set_capability(backend, &mut self.scissor_test, gl_enums::SCISSOR_TEST, !scissor.is_nil());
        if !scissor.is_nil() && changed(&mut self.scissor, scissor) {
            backend.scissor(scissor.x, scissor.y, scissor.width, scissor.height);
        }
    }

    pub fn apply_blending<B: Backend + ?Sized>(&mut self, backend: &mut B, blending: Blending) {
        set_capability(backend, &mut self.blend, gl_enums::BLEND, blending.enabled());
        if !blending.enabled() {
            return;
        }
        if changed(&mut self.blend_equation, (blending.eq_rgb, blending.eq_alpha)) {
            backend.blend_equation_separate(blending.eq_rgb.gl(), blending.eq_alpha.gl());
        }
        let func = (
            blending.src_rgb,
            blending.dst_rgb,
            blending.src_alpha,
            blending.dst_alpha,
        );
        if changed(&mut self.blend_func, func) {
            backend.blend_func_separate(
                blending.src_rgb.gl(),
                blending.dst_rgb.gl(),
                blending.src_alpha.gl(),
                blending.dst_alpha.gl(),
            );
        }
    }

    pub fn apply_stencil<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        op_func: StencilOpFunc,
        reference: StencilReference,
    ) {
        set_capability(backend, &mut self.stencil_test, gl_enums::STENCIL_TEST, op_func.enabled());
        if !op_func.enabled() {
            self.apply_stencil_write_mask(backend, 0);
            return;
        }
        if changed(
            &mut self.stencil_func,
            (op_func.compare, reference.reference, reference.read_mask),
        ) {
            backend.stencil_func(op_func.compare.gl(), reference.reference, reference.read_mask);
        }
        if changed(
            &mut self.stencil_op,
            (op_func.on_stencil_fail, op_func.on_depth_fail, op_func.on_pass),
        ) {
            backend.stencil_op(
                op_func.on_stencil_fail.gl(),
                op_func.on_depth_fail.gl(),
                op_func.on_pass.gl(),
            );
        }
        self.apply_stencil_write_mask(backend, reference.write_mask);
    }

    pub fn apply_stencil_write_mask<B: Backend + ?Sized>(&mut self, backend: &mut B, mask: u32) {
        if changed(&mut self.stencil_write_mask, mask) {
            backend.stencil_mask(mask);
        }
    }

    pub fn apply_color_mask<B: Backend + ?Sized>(&mut self, backend: &mut B, mask: ColorMask) {
        if changed(&mut self.color_mask, mask) {
            backend.color_mask(mask.red, mask.green, mask.blue, mask.alpha);
        }
    }

    pub fn apply_depth_mask<B: Backend + ?Sized>(&mut self, backend: &mut B, write: bool) {
        if changed(&mut self.depth_mask, write) {
            backend.depth_mask(write);
        }
    }

    pub fn apply_depth_and_front_face<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: DepthAndFrontFace,
    ) {
        if changed(&mut self.front_face, state.front_face) {
            backend.front_face(state.front_face.gl());
        }
        self.apply_depth_mask(backend, state.depth_mask);
        if changed(
            &mut self.depth_range,
            (state.depth_near.to_bits(), state.depth_far.to_bits()),
        ) {
            backend.depth_range(state.depth_near, state.depth_far);
        }
        let test = state.depth_func != CompareMode::Always;
        set_capability(backend, &mut self.depth_test, gl_enums::DEPTH_TEST, test);
        if test && changed(&mut self.depth_func, state.depth_func) {
            backend.depth_func(state.depth_func.gl());
        }
    }

    pub fn apply_cull_face<B: Backend + ?Sized>(&mut self, backend: &mut B, cull: CullFace) {
        let face = cull.gl();
        set_capability(backend, &mut self.cull, gl_enums::CULL_FACE, face.is_some());
        if let Some(face) = face {
            if changed(&mut self.cull_face, face) {
                backend.cull_face(face);
            }
        }
    }

    /// Selects texture unit `unit`; returns the previously selected unit if known.
    pub fn select_texture_unit<B: Backend + ?Sized>(&mut self, backend: &mut B, unit: u32) -> Option<u32> {
        let old = self.active_texture_unit;
        if changed(&mut self.active_texture_unit, unit) {
            backend.active_texture(gl_enums::TEXTURE0 + unit);
        }
        old
    }

    pub fn use_program<B: Backend + ?Sized>(&mut self, backend: &mut B, program: NativeId) {
        if changed(&mut self.program, program) {
            backend.use_program(program);
        }
    }

    pub fn bind_framebuffer<B: Backend + ?Sized>(&mut self, backend: &mut B, framebuffer: NativeId) {
        if changed(&mut self.framebuffer, framebuffer) {
            backend.bind_framebuffer(gl_enums::FRAMEBUFFER, framebuffer);
        }
    }

    /// Records a framebuffer binding made directly on the backend.
    pub(crate) fn note_framebuffer(&mut self, framebuffer: NativeId) {
        self.framebuffer = Some(framebuffer);
    }

    pub fn apply_viewport<B: Backend + ?Sized>(&mut self, backend: &mut B, width: u32, height: u32) {
        if changed(&mut self.viewport, (width, height)) {
            backend.viewport(0, 0, width as i32, height as i32);
        }
    }

    pub(crate) fn forget_program(&mut self, program: NativeId) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    pub fn program(&self) -> Option<NativeId> {
        self.program
    }

    pub fn active_texture_unit(&self) -> Option<u32> {
        self.active_texture_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::recording::{Call, RecordingBackend};

    #[test]
    fn nil_scissor_disables_test() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        cache.apply_scissor(&mut b, Scissor::new(0, 0, 10, 10));
        cache.apply_scissor(&mut b, Scissor::NIL);
        assert_eq!(
            b.calls(),
            &[
                Call::Enable(gl_enums::SCISSOR_TEST),
                Call::Scissor { x: 0, y: 0, width: 10, height: 10 },
                Call::Disable(gl_enums::SCISSOR_TEST),
            ]
        );
    }

    #[test]
    fn repeated_state_is_skipped() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        for _ in 0..3 {
            cache.apply_blending(&mut b, Blending::NORMAL);
            cache.apply_color_mask(&mut b, ColorMask::ALL_ENABLED);
            cache.apply_depth_and_front_face(&mut b, DepthAndFrontFace::DEFAULT);
            cache.apply_stencil(&mut b, StencilOpFunc::DISABLED, StencilReference::DEFAULT);
            cache.apply_cull_face(&mut b, CullFace::Back);
        }
        let first = b.take_calls();
        cache.apply_blending(&mut b, Blending::NORMAL);
        assert!(b.calls().is_empty());
        assert!(first.len() > 5);
    }

    #[test]
    fn changing_one_blend_field_sends_one_call() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        cache.apply_blending(&mut b, Blending::NORMAL);
        b.clear_calls();
        cache.apply_blending(&mut b, Blending::ADD);
        assert_eq!(b.calls().len(), 1);
        assert!(matches!(b.calls()[0], Call::BlendFuncSeparate { .. }));
    }

    #[test]
    fn depth_always_disables_test() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        cache.apply_depth_and_front_face(&mut b, DepthAndFrontFace::DEFAULT);
        assert!(b.calls().contains(&Call::Disable(gl_enums::DEPTH_TEST)));
        assert!(!b.calls().iter().any(|c| matches!(c, Call::DepthFunc(_))));
        b.clear_calls();
        cache.apply_depth_and_front_face(
            &mut b,
            DepthAndFrontFace {
                depth_func: CompareMode::Less,
                ..DepthAndFrontFace::DEFAULT
            },
        );
        assert_eq!(
            b.calls(),
            &[
                Call::Enable(gl_enums::DEPTH_TEST),
                Call::DepthFunc(gl_enums::LESS)
            ]
        );
    }

    #[test]
    fn disabled_stencil_masks_writes() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        cache.apply_stencil(&mut b, StencilOpFunc::DISABLED, StencilReference::DEFAULT);
        assert_eq!(
            b.calls(),
            &[Call::Disable(gl_enums::STENCIL_TEST), Call::StencilMask(0)]
        );
    }

    #[test]
    fn texture_unit_reselect_is_noop() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        assert_eq!(cache.select_texture_unit(&mut b, 2), None);
        assert_eq!(cache.select_texture_unit(&mut b, 2), Some(2));
        assert_eq!(b.calls(), &[Call::ActiveTexture(gl_enums::TEXTURE0 + 2)]);
    }

    #[test]
    fn invalidate_resends() {
        let mut b = RecordingBackend::new();
        let mut cache = StateCache::new();
        cache.apply_color_mask(&mut b, ColorMask::ALL_DISABLED);
        cache.invalidate();
        cache.apply_color_mask(&mut b, ColorMask::ALL_DISABLED);
        assert_eq!(b.count(|c| matches!(c, Call::ColorMask { .. })), 2);
    }
}
