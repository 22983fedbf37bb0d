// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A backend that records every native call instead of executing it.

This is the headless backend: it never touches a GPU, so it is what the crate's own tests
drive, and what an upper layer can use to inspect the exact call stream a frame produces.

Object names are handed out sequentially from `1`, shared across every object kind, so the
first buffer, texture or framebuffer you create is always `1`.
*/

use super::{Backend, NativeId, UniformLocation};
use std::collections::HashMap;

/// One recorded native call.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Call {
    CreateBuffer(NativeId),
    DeleteBuffer(NativeId),
    BindBuffer { target: u32, buffer: NativeId },
    BufferData { target: u32, len: usize, usage: u32 },
    CreateTexture(NativeId),
    DeleteTexture(NativeId),
    ActiveTexture(u32),
    BindTexture { target: u32, texture: NativeId },
    TexImage2D {
        target: u32,
        level: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        /// `None` when the call only allocated storage.
        len: Option<usize>,
    },
    TexParameter { target: u32, parameter: u32, value: i32 },
    GenerateMipmap(u32),
    CopyTexImage2D {
        target: u32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    PixelStore { parameter: u32, value: i32 },
    CreateFramebuffer(NativeId),
    DeleteFramebuffer(NativeId),
    BindFramebuffer(NativeId),
    FramebufferTexture2D { attachment: u32, texture_target: u32, texture: NativeId },
    CreateRenderbuffer(NativeId),
    DeleteRenderbuffer(NativeId),
    BindRenderbuffer(NativeId),
    RenderbufferStorage { internal_format: u32, samples: i32, width: i32, height: i32 },
    FramebufferRenderbuffer { attachment: u32, renderbuffer: NativeId },
    Enable(u32),
    Disable(u32),
    Scissor { x: i32, y: i32, width: i32, height: i32 },
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    BlendEquationSeparate { rgb: u32, alpha: u32 },
    BlendFuncSeparate { src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32 },
    ColorMask { red: bool, green: bool, blue: bool, alpha: bool },
    DepthMask(bool),
    DepthRange { near: f32, far: f32 },
    DepthFunc(u32),
    FrontFace(u32),
    CullFace(u32),
    StencilFunc { func: u32, reference: i32, read_mask: u32 },
    StencilOp { stencil_fail: u32, depth_fail: u32, depth_pass: u32 },
    StencilMask(u32),
    ClearColor { red: f32, green: f32, blue: f32, alpha: f32 },
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        location: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribDivisor { location: u32, divisor: u32 },
    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawArraysInstanced { mode: u32, first: i32, count: i32, instances: i32 },
    DrawElements { mode: u32, count: i32, index_type: u32, offset: i32 },
    DrawElementsInstanced {
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    },
    ReadPixels { x: i32, y: i32, width: i32, height: i32, format: u32, ty: u32 },
    CreateShader { kind: u32, shader: NativeId },
    CompileShader(NativeId),
    DeleteShader(NativeId),
    CreateProgram(NativeId),
    AttachShader { program: NativeId, shader: NativeId },
    BindAttribLocation { program: NativeId, location: u32, name: String },
    LinkProgram(NativeId),
    DeleteProgram(NativeId),
    UseProgram(NativeId),
    UniformF32 { location: UniformLocation, components: u8, data: Vec<f32> },
    UniformI32 { location: UniformLocation, components: u8, data: Vec<i32> },
    UniformMatrixF32 { location: UniformLocation, dimension: u8, data: Vec<f32> },
    Flush,
}

impl Call {
    /// True for any of the four draw variants.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            Call::DrawArrays { .. }
                | Call::DrawArraysInstanced { .. }
                | Call::DrawElements { .. }
                | Call::DrawElementsInstanced { .. }
        )
    }

    /// True for calls that change fixed-function render state.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Call::Enable(_)
                | Call::Disable(_)
                | Call::Scissor { .. }
                | Call::BlendEquationSeparate { .. }
                | Call::BlendFuncSeparate { .. }
                | Call::ColorMask { .. }
                | Call::DepthMask(_)
                | Call::DepthRange { .. }
                | Call::DepthFunc(_)
                | Call::FrontFace(_)
                | Call::CullFace(_)
                | Call::StencilFunc { .. }
                | Call::StencilOp { .. }
                | Call::StencilMask(_)
        )
    }
}

/// A [Backend] that records calls.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    next_id: NativeId,
    bound_framebuffer: NativeId,
    uniform_locations: HashMap<(NativeId, String), UniformLocation>,
    hidden_uniforms: Vec<String>,
    fail_compile: bool,
    panic_on_next_draw: bool,
    read_fill: u8,
    version: String,
}

impl RecordingBackend {
    pub fn new() -> Self {
        RecordingBackend {
            calls: Vec::new(),
            next_id: 1,
            bound_framebuffer: 0,
            uniform_locations: HashMap::new(),
            hidden_uniforms: Vec::new(),
            fail_compile: false,
            panic_on_next_draw: false,
            read_fill: 0,
            version: "RecordingBackend 1.0".to_string(),
        }
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Returns the recorded calls and starts a fresh recording.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Pretends a surface owner bound `framebuffer` outside of the context.
    pub fn set_surface_framebuffer(&mut self, framebuffer: NativeId) {
        self.bound_framebuffer = framebuffer;
    }

    /// Makes every following shader compile fail.
    pub fn set_fail_compile(&mut self, fail: bool) {
        self.fail_compile = fail;
    }

    /// The next draw call is recorded and then panics, like a driver fault would.
    pub fn panic_on_next_draw(&mut self) {
        self.panic_on_next_draw = true;
    }

    /// Uniforms with this name report a negative location, as if the linker optimized them out.
    pub fn hide_uniform(&mut self, name: &str) {
        self.hidden_uniforms.push(name.to_string());
    }

    /// Byte written into every readback.
    pub fn set_read_fill(&mut self, fill: u8) {
        self.read_fill = fill;
    }

    fn allocate(&mut self) -> NativeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record_draw(&mut self, call: Call) {
        self.calls.push(call);
        if self.panic_on_next_draw {
            self.panic_on_next_draw = false;
            panic!("recorded draw failure");
        }
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RecordingBackend {
    fn create_buffer(&mut self) -> NativeId {
        let id = self.allocate();
        self.calls.push(Call::CreateBuffer(id));
        id
    }
    fn delete_buffer(&mut self, buffer: NativeId) {
        self.calls.push(Call::DeleteBuffer(buffer));
    }
    fn bind_buffer(&mut self, target: u32, buffer: NativeId) {
        self.calls.push(Call::BindBuffer { target, buffer });
    }
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.calls.push(Call::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn create_texture(&mut self) -> NativeId {
        let id = self.allocate();
        self.calls.push(Call::CreateTexture(id));
        id
    }
    fn delete_texture(&mut self, texture: NativeId) {
        self.calls.push(Call::DeleteTexture(texture));
    }
    fn active_texture(&mut self, unit: u32) {
        self.calls.push(Call::ActiveTexture(unit));
    }
    fn bind_texture(&mut self, target: u32, texture: NativeId) {
        self.calls.push(Call::BindTexture { target, texture });
    }
    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        self.calls.push(Call::TexImage2D {
            target,
            level,
            internal_format,
            width,
            height,
            format,
            ty,
            len: pixels.map(<[u8]>::len),
        });
    }
    fn tex_parameter(&mut self, target: u32, parameter: u32, value: i32) {
        self.calls.push(Call::TexParameter {
            target,
            parameter,
            value,
        });
    }
    fn generate_mipmap(&mut self, target: u32) {
        self.calls.push(Call::GenerateMipmap(target));
    }
    fn copy_tex_image_2d(
        &mut self,
        target: u32,
        _level: i32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) {
        self.calls.push(Call::CopyTexImage2D {
            target,
            internal_format,
            x,
            y,
            width,
            height,
        });
    }
    fn pixel_store(&mut self, parameter: u32, value: i32) {
        self.calls.push(Call::PixelStore { parameter, value });
    }

    fn create_framebuffer(&mut self) -> NativeId {
        let id = self.allocate();
        self.calls.push(Call::CreateFramebuffer(id));
        id
    }
    fn delete_framebuffer(&mut self, framebuffer: NativeId) {
        self.calls.push(Call::DeleteFramebuffer(framebuffer));
    }
    fn bind_framebuffer(&mut self, _target: u32, framebuffer: NativeId) {
        self.bound_framebuffer = framebuffer;
        self.calls.push(Call::BindFramebuffer(framebuffer));
    }
    fn framebuffer_binding(&mut self) -> NativeId {
        self.bound_framebuffer
    }
    fn framebuffer_texture_2d(
        &mut self,
        _target: u32,
        attachment: u32,
        texture_target: u32,
        texture: NativeId,
        _level: i32,
    ) {
        self.calls.push(Call::FramebufferTexture2D {
            attachment,
            texture_target,
            texture,
        });
    }
    fn create_renderbuffer(&mut self) -> NativeId {
        let id = self.allocate();
        self.calls.push(Call::CreateRenderbuffer(id));
        id
    }
    fn delete_renderbuffer(&mut self, renderbuffer: NativeId) {
        self.calls.push(Call::DeleteRenderbuffer(renderbuffer));
    }
    fn bind_renderbuffer(&mut self, _target: u32, renderbuffer: NativeId) {
        self.calls.push(Call::BindRenderbuffer(renderbuffer));
    }
    fn renderbuffer_storage(&mut self, _target: u32, internal_format: u32, width: i32, height: i32) {
        self.calls.push(Call::RenderbufferStorage {
            internal_format,
            samples: 1,
            width,
            height,
        });
    }
    fn renderbuffer_storage_multisample(
        &mut self,
        _target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        self.calls.push(Call::RenderbufferStorage {
            internal_format,
            samples,
            width,
            height,
        });
    }
    fn framebuffer_renderbuffer(
        &mut self,
        _target: u32,
        attachment: u32,
        _renderbuffer_target: u32,
        renderbuffer: NativeId,
    ) {
        self.calls.push(Call::FramebufferRenderbuffer {
            attachment,
            renderbuffer,
        });
    }

    fn enable(&mut self, capability: u32) {
        self.calls.push(Call::Enable(capability));
    }
    fn disable(&mut self, capability: u32) {
        self.calls.push(Call::Disable(capability));
    }
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(Call::Scissor {
            x,
            y,
            width,
            height,
        });
    }
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(Call::Viewport {
            x,
            y,
            width,
            height,
        });
    }
    fn blend_equation_separate(&mut self, rgb: u32, alpha: u32) {
        self.calls.push(Call::BlendEquationSeparate { rgb, alpha });
    }
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.calls.push(Call::BlendFuncSeparate {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        });
    }
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.calls.push(Call::ColorMask {
            red,
            green,
            blue,
            alpha,
        });
    }
    fn depth_mask(&mut self, write: bool) {
        self.calls.push(Call::DepthMask(write));
    }
    fn depth_range(&mut self, near: f32, far: f32) {
        self.calls.push(Call::DepthRange { near, far });
    }
    fn depth_func(&mut self, func: u32) {
        self.calls.push(Call::DepthFunc(func));
    }
    fn front_face(&mut self, mode: u32) {
        self.calls.push(Call::FrontFace(mode));
    }
    fn cull_face(&mut self, face: u32) {
        self.calls.push(Call::CullFace(face));
    }
    fn stencil_func(&mut self, func: u32, reference: i32, read_mask: u32) {
        self.calls.push(Call::StencilFunc {
            func,
            reference,
            read_mask,
        });
    }
    fn stencil_op(&mut self, stencil_fail: u32, depth_fail: u32, depth_pass: u32) {
        self.calls.push(Call::StencilOp {
            stencil_fail,
            depth_fail,
            depth_pass,
        });
    }
    fn stencil_mask(&mut self, write_mask: u32) {
        self.calls.push(Call::StencilMask(write_mask));
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.calls.push(Call::ClearColor {
            red,
            green,
            blue,
            alpha,
        });
    }
    fn clear_depth(&mut self, depth: f32) {
        self.calls.push(Call::ClearDepth(depth));
    }
    fn clear_stencil(&mut self, stencil: i32) {
        self.calls.push(Call::ClearStencil(stencil));
    }
    fn clear(&mut self, mask: u32) {
        self.calls.push(Call::Clear(mask));
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(Call::EnableVertexAttribArray(location));
    }
    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(Call::DisableVertexAttribArray(location));
    }
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.calls.push(Call::VertexAttribPointer {
            location,
            components,
            ty,
            normalized,
            stride,
            offset,
        });
    }
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        self.calls
            .push(Call::VertexAttribDivisor { location, divisor });
    }
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.record_draw(Call::DrawArrays { mode, first, count });
    }
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.record_draw(Call::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }
    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: i32) {
        self.record_draw(Call::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }
    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    ) {
        self.record_draw(Call::DrawElementsInstanced {
            mode,
            count,
            index_type,
            offset,
            instances,
        });
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) {
        out.fill(self.read_fill);
        self.calls.push(Call::ReadPixels {
            x,
            y,
            width,
            height,
            format,
            ty,
        });
    }

    fn create_shader(&mut self, kind: u32) -> NativeId {
        let shader = self.allocate();
        self.calls.push(Call::CreateShader { kind, shader });
        shader
    }
    fn compile_shader(&mut self, shader: NativeId, _source: &str) -> bool {
        self.calls.push(Call::CompileShader(shader));
        !self.fail_compile
    }
    fn shader_info_log(&mut self, shader: NativeId) -> String {
        if self.fail_compile {
            format!("ERROR: 0:1: shader {shader} rejected by recording backend")
        } else {
            String::new()
        }
    }
    fn delete_shader(&mut self, shader: NativeId) {
        self.calls.push(Call::DeleteShader(shader));
    }
    fn create_program(&mut self) -> NativeId {
        let id = self.allocate();
        self.calls.push(Call::CreateProgram(id));
        id
    }
    fn attach_shader(&mut self, program: NativeId, shader: NativeId) {
        self.calls.push(Call::AttachShader { program, shader });
    }
    fn bind_attrib_location(&mut self, program: NativeId, location: u32, name: &str) {
        self.calls.push(Call::BindAttribLocation {
            program,
            location,
            name: name.to_string(),
        });
    }
    fn link_program(&mut self, program: NativeId) -> bool {
        self.calls.push(Call::LinkProgram(program));
        true
    }
    fn program_info_log(&mut self, _program: NativeId) -> String {
        String::new()
    }
    fn delete_program(&mut self, program: NativeId) {
        self.calls.push(Call::DeleteProgram(program));
    }
    fn use_program(&mut self, program: NativeId) {
        self.calls.push(Call::UseProgram(program));
    }
    fn uniform_location(&mut self, program: NativeId, name: &str) -> UniformLocation {
        if self.hidden_uniforms.iter().any(|h| h == name) {
            return -1;
        }
        let next = self.uniform_locations.len() as UniformLocation;
        *self
            .uniform_locations
            .entry((program, name.to_string()))
            .or_insert(next)
    }
    fn uniform_f32(&mut self, location: UniformLocation, components: u8, _count: i32, data: &[f32]) {
        self.calls.push(Call::UniformF32 {
            location,
            components,
            data: data.to_vec(),
        });
    }
    fn uniform_i32(&mut self, location: UniformLocation, components: u8, _count: i32, data: &[i32]) {
        self.calls.push(Call::UniformI32 {
            location,
            components,
            data: data.to_vec(),
        });
    }
    fn uniform_matrix_f32(
        &mut self,
        location: UniformLocation,
        dimension: u8,
        _count: i32,
        data: &[f32],
    ) {
        self.calls.push(Call::UniformMatrixF32 {
            location,
            dimension,
            data: data.to_vec(),
        });
    }

    fn version_string(&mut self) -> String {
        self.version.clone()
    }
    fn error(&mut self) -> u32 {
        super::gl_enums::NO_ERROR
    }
    fn flush(&mut self) {
        self.calls.push(Call::Flush);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::gl_enums::*;

    #[test]
    fn ids_are_sequential_across_kinds() {
        let mut b = RecordingBackend::new();
        assert_eq!(b.create_buffer(), 1);
        assert_eq!(b.create_texture(), 2);
        assert_eq!(b.create_framebuffer(), 3);
        assert_eq!(b.calls().len(), 3);
    }

    #[test]
    fn framebuffer_binding_tracks_binds() {
        let mut b = RecordingBackend::new();
        b.set_surface_framebuffer(9);
        assert_eq!(b.framebuffer_binding(), 9);
        b.bind_framebuffer(FRAMEBUFFER, 4);
        assert_eq!(b.framebuffer_binding(), 4);
    }

    #[test]
    fn draw_panic_is_one_shot() {
        let mut b = RecordingBackend::new();
        b.panic_on_next_draw();
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            b.draw_arrays(TRIANGLES, 0, 3);
        }));
        assert!(r.is_err());
        b.draw_arrays(TRIANGLES, 0, 3);
        assert_eq!(b.count(Call::is_draw), 2);
    }

    #[test]
    fn uniform_locations_are_memoized_per_program() {
        let mut b = RecordingBackend::new();
        let a = b.uniform_location(1, "u_color");
        assert_eq!(b.uniform_location(1, "u_color"), a);
        assert_ne!(b.uniform_location(2, "u_color"), a);
        b.hide_uniform("u_unused");
        assert_eq!(b.uniform_location(1, "u_unused"), -1);
    }
}
