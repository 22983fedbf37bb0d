// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The native call surface.

Everything above this module speaks in logical resources and render state.  Everything
below it is an OpenGL-class immediate-mode API.  A [Backend] is the narrow seam between
the two: any type that can carry out these calls can be driven by a
[Context](crate::images::Context).

Object names are plain integers ([NativeId]); `0` always means "no object", which is also
how the default framebuffer and "unbind" are expressed.
*/

pub mod gl_enums;
pub mod recording;

#[cfg(feature = "backend_glow")]
pub mod glow;

/// A backend-side object name.  `0` is never a live object.
pub type NativeId = u32;

/// A uniform location inside a linked program.  Negative values mean "not present".
pub type UniformLocation = i32;

/// The native calls issued by a [Context](crate::images::Context).
///
/// Calls must be issued from the render thread; implementations may assume they are never
/// called concurrently.
pub trait Backend {
    // buffers
    fn create_buffer(&mut self) -> NativeId;
    fn delete_buffer(&mut self, buffer: NativeId);
    fn bind_buffer(&mut self, target: u32, buffer: NativeId);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);

    // textures
    fn create_texture(&mut self) -> NativeId;
    fn delete_texture(&mut self, texture: NativeId);
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: u32, texture: NativeId);
    #[allow(clippy::too_many_arguments)]
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
    );
    fn tex_parameter(&mut self, target: u32, parameter: u32, value: i32);
    fn generate_mipmap(&mut self, target: u32);
    #[allow(clippy::too_many_arguments)]
    fn copy_tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    );
    fn pixel_store(&mut self, parameter: u32, value: i32);

    // framebuffers
    fn create_framebuffer(&mut self) -> NativeId;
    fn delete_framebuffer(&mut self, framebuffer: NativeId);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: NativeId);
    /// The framebuffer currently bound by whoever owns the surface.
    fn framebuffer_binding(&mut self) -> NativeId;
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: NativeId,
        level: i32,
    );
    fn create_renderbuffer(&mut self) -> NativeId;
    fn delete_renderbuffer(&mut self, renderbuffer: NativeId);
    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: NativeId);
    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32);
    fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: NativeId,
    );

    // fixed-function state
    fn enable(&mut self, capability: u32);
    fn disable(&mut self, capability: u32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn blend_equation_separate(&mut self, rgb: u32, alpha: u32);
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    fn depth_mask(&mut self, write: bool);
    fn depth_range(&mut self, near: f32, far: f32);
    fn depth_func(&mut self, func: u32);
    fn front_face(&mut self, mode: u32);
    fn cull_face(&mut self, face: u32);
    fn stencil_func(&mut self, func: u32, reference: i32, read_mask: u32);
    fn stencil_op(&mut self, stencil_fail: u32, depth_fail: u32, depth_pass: u32);
    fn stencil_mask(&mut self, write_mask: u32);

    // clearing
    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn clear(&mut self, mask: u32);

    // vertex input and drawing
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn disable_vertex_attrib_array(&mut self, location: u32);
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32);
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: i32);
    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    );

    // readback
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        out: &mut [u8],
    );

    // programs
    fn create_shader(&mut self, kind: u32) -> NativeId;
    /// Compiles `source` into `shader`; returns whether compilation succeeded.
    fn compile_shader(&mut self, shader: NativeId, source: &str) -> bool;
    fn shader_info_log(&mut self, shader: NativeId) -> String;
    fn delete_shader(&mut self, shader: NativeId);
    fn create_program(&mut self) -> NativeId;
    fn attach_shader(&mut self, program: NativeId, shader: NativeId);
    fn bind_attrib_location(&mut self, program: NativeId, location: u32, name: &str);
    /// Links `program`; returns whether linking succeeded.
    fn link_program(&mut self, program: NativeId) -> bool;
    fn program_info_log(&mut self, program: NativeId) -> String;
    fn delete_program(&mut self, program: NativeId);
    fn use_program(&mut self, program: NativeId);
    fn uniform_location(&mut self, program: NativeId, name: &str) -> UniformLocation;
    /// `components` is 1..=4; `data` holds `count * components` values.
    fn uniform_f32(&mut self, location: UniformLocation, components: u8, count: i32, data: &[f32]);
    /// `components` is 1..=4; `data` holds `count * components` values.
    fn uniform_i32(&mut self, location: UniformLocation, components: u8, count: i32, data: &[i32]);
    /// `dimension` is 2, 3 or 4; `data` holds `count * dimension * dimension` values.
    fn uniform_matrix_f32(&mut self, location: UniformLocation, dimension: u8, count: i32, data: &[f32]);

    // misc
    fn version_string(&mut self) -> String;
    fn error(&mut self) -> u32;
    fn flush(&mut self);

    /// Called when the native context was lost and every native object is gone.
    fn handle_context_lost(&mut self) {}
}
