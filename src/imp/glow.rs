// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A [Backend] over [glow], for desktop GL, GLES and WebGL.

glow hands out opaque typed objects; the context speaks in integer names.  This backend keeps
the translation tables between the two.  Surface framebuffers that were created outside of this
backend are adopted into the framebuffer table the first time they are observed bound.  Textures
owned by someone else are adopted explicitly with [GlowBackend::adopt_texture].
*/

use super::{Backend, NativeId, UniformLocation};
use glow::{HasContext, PixelPackData, PixelUnpackData};
use std::collections::HashMap;
use std::sync::Arc;

pub struct GlowBackend {
    gl: Arc<glow::Context>,
    next_id: NativeId,
    buffers: HashMap<NativeId, glow::Buffer>,
    textures: HashMap<NativeId, glow::Texture>,
    framebuffers: HashMap<NativeId, glow::Framebuffer>,
    renderbuffers: HashMap<NativeId, glow::Renderbuffer>,
    shaders: HashMap<NativeId, glow::Shader>,
    programs: HashMap<NativeId, glow::Program>,
    uniforms: LocationTable<glow::UniformLocation>,
}

impl std::fmt::Debug for GlowBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowBackend")
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("framebuffers", &self.framebuffers.len())
            .field("programs", &self.programs.len())
            .field("uniform_locations", &self.uniforms.len())
            .finish()
    }
}

impl GlowBackend {
    /// Wraps a context that is current on the calling thread.
    pub fn new(gl: Arc<glow::Context>) -> Self {
        GlowBackend {
            gl,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            renderbuffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            uniforms: LocationTable::default(),
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn allocate(&mut self) -> NativeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Names a texture created outside of this backend, for use in
    /// [NativeTexture](crate::pixel_formats::NativeTexture).
    ///
    /// Adopting the same texture twice returns the same name.  The texture is never deleted by
    /// this backend; its owner keeps that responsibility.
    pub fn adopt_texture(&mut self, texture: glow::Texture) -> NativeId {
        adopt(&mut self.textures, &mut self.next_id, texture)
    }

    fn location(&self, location: UniformLocation) -> Option<&glow::UniformLocation> {
        self.uniforms.get(location)
    }
}

/// Integer names for glow's uniform locations, one per `(program, name)`.
#[derive(Debug)]
struct LocationTable<L> {
    next: UniformLocation,
    by_name: HashMap<(NativeId, String), UniformLocation>,
    locations: HashMap<UniformLocation, L>,
}

impl<L> Default for LocationTable<L> {
    fn default() -> Self {
        LocationTable {
            next: 0,
            by_name: HashMap::new(),
            locations: HashMap::new(),
        }
    }
}

impl<L> LocationTable<L> {
    /// The name for `uniform` in `program`, querying `find` only the first time.  `-1` if absent.
    fn resolve(&mut self, program: NativeId, uniform: &str, find: impl FnOnce() -> Option<L>) -> UniformLocation {
        if let Some(location) = self.by_name.get(&(program, uniform.to_string())) {
            return *location;
        }
        let Some(found) = find() else {
            return -1;
        };
        let location = self.next;
        self.next += 1;
        self.locations.insert(location, found);
        self.by_name.insert((program, uniform.to_string()), location);
        location
    }

    fn get(&self, location: UniformLocation) -> Option<&L> {
        self.locations.get(&location)
    }

    fn forget_program(&mut self, program: NativeId) {
        let locations = &mut self.locations;
        self.by_name.retain(|(owner, _), location| {
            if *owner == program {
                locations.remove(location);
                false
            } else {
                true
            }
        });
    }

    fn clear(&mut self) {
        self.by_name.clear();
        self.locations.clear();
    }

    fn len(&self) -> usize {
        self.locations.len()
    }
}

/// The existing name of `object`, or a fresh one recorded in `table`.
fn adopt<T: Copy + PartialEq>(table: &mut HashMap<NativeId, T>, next_id: &mut NativeId, object: T) -> NativeId {
    if let Some((id, _)) = table.iter().find(|(_, o)| **o == object) {
        return *id;
    }
    let id = *next_id;
    *next_id += 1;
    table.insert(id, object);
    id
}

fn lookup<T: Copy>(table: &HashMap<NativeId, T>, id: NativeId) -> Option<T> {
    if id == 0 { None } else { table.get(&id).copied() }
}

/// glow reports allocation failure as a string; a context that cannot allocate names is unusable.
fn created<T>(r: Result<T, String>, what: &str) -> T {
    match r {
        Ok(t) => t,
        Err(e) => panic!("glow failed to create {what}: {e}"),
    }
}

impl Backend for GlowBackend {
    fn create_buffer(&mut self) -> NativeId {
        let buffer = created(unsafe { self.gl.create_buffer() }, "buffer");
        let id = self.allocate();
        self.buffers.insert(id, buffer);
        id
    }
    fn delete_buffer(&mut self, buffer: NativeId) {
        if let Some(b) = self.buffers.remove(&buffer) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }
    fn bind_buffer(&mut self, target: u32, buffer: NativeId) {
        let b = lookup(&self.buffers, buffer);
        unsafe { self.gl.bind_buffer(target, b) }
    }
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn create_texture(&mut self) -> NativeId {
        let texture = created(unsafe { self.gl.create_texture() }, "texture");
        let id = self.allocate();
        self.textures.insert(id, texture);
        id
    }
    fn delete_texture(&mut self, texture: NativeId) {
        if let Some(t) = self.textures.remove(&texture) {
            unsafe { self.gl.delete_texture(t) }
        }
    }
    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }
    fn bind_texture(&mut self, target: u32, texture: NativeId) {
        let t = lookup(&self.textures, texture);
        unsafe { self.gl.bind_texture(target, t) }
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
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format as i32,
                width,
                height,
                0,
                format,
                ty,
                PixelUnpackData::Slice(pixels),
            )
        }
    }
    fn tex_parameter(&mut self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }
    fn generate_mipmap(&mut self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }
    fn copy_tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) {
        unsafe {
            self.gl
                .copy_tex_image_2d(target, level, internal_format, x, y, width, height, 0)
        }
    }
    fn pixel_store(&mut self, parameter: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(parameter, value) }
    }

    fn create_framebuffer(&mut self) -> NativeId {
        let framebuffer = created(unsafe { self.gl.create_framebuffer() }, "framebuffer");
        let id = self.allocate();
        self.framebuffers.insert(id, framebuffer);
        id
    }
    fn delete_framebuffer(&mut self, framebuffer: NativeId) {
        if let Some(f) = self.framebuffers.remove(&framebuffer) {
            unsafe { self.gl.delete_framebuffer(f) }
        }
    }
    fn bind_framebuffer(&mut self, target: u32, framebuffer: NativeId) {
        let f = lookup(&self.framebuffers, framebuffer);
        unsafe { self.gl.bind_framebuffer(target, f) }
    }
    fn framebuffer_binding(&mut self) -> NativeId {
        let bound = unsafe { self.gl.get_parameter_framebuffer(glow::FRAMEBUFFER_BINDING) };
        let Some(bound) = bound else {
            return 0;
        };
        adopt(&mut self.framebuffers, &mut self.next_id, bound)
    }
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: NativeId,
        level: i32,
    ) {
        let t = lookup(&self.textures, texture);
        unsafe {
            self.gl
                .framebuffer_texture_2d(target, attachment, texture_target, t, level)
        }
    }
    fn create_renderbuffer(&mut self) -> NativeId {
        let renderbuffer = created(unsafe { self.gl.create_renderbuffer() }, "renderbuffer");
        let id = self.allocate();
        self.renderbuffers.insert(id, renderbuffer);
        id
    }
    fn delete_renderbuffer(&mut self, renderbuffer: NativeId) {
        if let Some(r) = self.renderbuffers.remove(&renderbuffer) {
            unsafe { self.gl.delete_renderbuffer(r) }
        }
    }
    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: NativeId) {
        let r = lookup(&self.renderbuffers, renderbuffer);
        unsafe { self.gl.bind_renderbuffer(target, r) }
    }
    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        unsafe {
            self.gl
                .renderbuffer_storage(target, internal_format, width, height)
        }
    }
    fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        unsafe {
            self.gl
                .renderbuffer_storage_multisample(target, samples, internal_format, width, height)
        }
    }
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: NativeId,
    ) {
        let r = lookup(&self.renderbuffers, renderbuffer);
        unsafe {
            self.gl
                .framebuffer_renderbuffer(target, attachment, renderbuffer_target, r)
        }
    }

    fn enable(&mut self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }
    fn disable(&mut self, capability: u32) {
        unsafe { self.gl.disable(capability) }
    }
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }
    fn blend_equation_separate(&mut self, rgb: u32, alpha: u32) {
        unsafe { self.gl.blend_equation_separate(rgb, alpha) }
    }
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe {
            self.gl
                .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
        }
    }
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        unsafe { self.gl.color_mask(red, green, blue, alpha) }
    }
    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }
    fn depth_range(&mut self, near: f32, far: f32) {
        unsafe { self.gl.depth_range_f32(near, far) }
    }
    fn depth_func(&mut self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }
    fn front_face(&mut self, mode: u32) {
        unsafe { self.gl.front_face(mode) }
    }
    fn cull_face(&mut self, face: u32) {
        unsafe { self.gl.cull_face(face) }
    }
    fn stencil_func(&mut self, func: u32, reference: i32, read_mask: u32) {
        unsafe { self.gl.stencil_func(func, reference, read_mask) }
    }
    fn stencil_op(&mut self, stencil_fail: u32, depth_fail: u32, depth_pass: u32) {
        unsafe { self.gl.stencil_op(stencil_fail, depth_fail, depth_pass) }
    }
    fn stencil_mask(&mut self, write_mask: u32) {
        unsafe { self.gl.stencil_mask(write_mask) }
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.gl.clear_color(red, green, blue, alpha) }
    }
    fn clear_depth(&mut self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) }
    }
    fn clear_stencil(&mut self, stencil: i32) {
        unsafe { self.gl.clear_stencil(stencil) }
    }
    fn clear(&mut self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }
    fn disable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) }
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
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(location, components, ty, normalized, stride, offset)
        }
    }
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) }
    }
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }
    fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, index_type, offset) }
    }
    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.gl
                .draw_elements_instanced(mode, count, index_type, offset, instances)
        }
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
        unsafe {
            self.gl.read_pixels(
                x,
                y,
                width,
                height,
                format,
                ty,
                PixelPackData::Slice(Some(out)),
            )
        }
    }

    fn create_shader(&mut self, kind: u32) -> NativeId {
        let shader = created(unsafe { self.gl.create_shader(kind) }, "shader");
        let id = self.allocate();
        self.shaders.insert(id, shader);
        id
    }
    fn compile_shader(&mut self, shader: NativeId, source: &str) -> bool {
        let Some(s) = lookup(&self.shaders, shader) else {
            return false;
        };
        unsafe {
            self.gl.shader_source(s, source);
            self.gl.compile_shader(s);
            self.gl.get_shader_compile_status(s)
        }
    }
    fn shader_info_log(&mut self, shader: NativeId) -> String {
        match lookup(&self.shaders, shader) {
            Some(s) => unsafe { self.gl.get_shader_info_log(s) },
            None => String::new(),
        }
    }
    fn delete_shader(&mut self, shader: NativeId) {
        if let Some(s) = self.shaders.remove(&shader) {
            unsafe { self.gl.delete_shader(s) }
        }
    }
    fn create_program(&mut self) -> NativeId {
        let program = created(unsafe { self.gl.create_program() }, "program");
        let id = self.allocate();
        self.programs.insert(id, program);
        id
    }
    fn attach_shader(&mut self, program: NativeId, shader: NativeId) {
        if let (Some(p), Some(s)) = (lookup(&self.programs, program), lookup(&self.shaders, shader)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }
    fn bind_attrib_location(&mut self, program: NativeId, location: u32, name: &str) {
        if let Some(p) = lookup(&self.programs, program) {
            unsafe { self.gl.bind_attrib_location(p, location, name) }
        }
    }
    fn link_program(&mut self, program: NativeId) -> bool {
        let Some(p) = lookup(&self.programs, program) else {
            return false;
        };
        unsafe {
            self.gl.link_program(p);
            self.gl.get_program_link_status(p)
        }
    }
    fn program_info_log(&mut self, program: NativeId) -> String {
        match lookup(&self.programs, program) {
            Some(p) => unsafe { self.gl.get_program_info_log(p) },
            None => String::new(),
        }
    }
    fn delete_program(&mut self, program: NativeId) {
        if let Some(p) = self.programs.remove(&program) {
            unsafe { self.gl.delete_program(p) }
        }
        self.uniforms.forget_program(program);
    }
    fn use_program(&mut self, program: NativeId) {
        let p = lookup(&self.programs, program);
        unsafe { self.gl.use_program(p) }
    }
    fn uniform_location(&mut self, program: NativeId, name: &str) -> UniformLocation {
        let Some(p) = lookup(&self.programs, program) else {
            return -1;
        };
        let gl = &self.gl;
        self.uniforms
            .resolve(program, name, || unsafe { gl.get_uniform_location(p, name) })
    }
    fn uniform_f32(&mut self, location: UniformLocation, components: u8, _count: i32, data: &[f32]) {
        let l = self.location(location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_f32_slice(l, data),
                2 => self.gl.uniform_2_f32_slice(l, data),
                3 => self.gl.uniform_3_f32_slice(l, data),
                _ => self.gl.uniform_4_f32_slice(l, data),
            }
        }
    }
    fn uniform_i32(&mut self, location: UniformLocation, components: u8, _count: i32, data: &[i32]) {
        let l = self.location(location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_i32_slice(l, data),
                2 => self.gl.uniform_2_i32_slice(l, data),
                3 => self.gl.uniform_3_i32_slice(l, data),
                _ => self.gl.uniform_4_i32_slice(l, data),
            }
        }
    }
    fn uniform_matrix_f32(
        &mut self,
        location: UniformLocation,
        dimension: u8,
        _count: i32,
        data: &[f32],
    ) {
        let l = self.location(location);
        unsafe {
            match dimension {
                2 => self.gl.uniform_matrix_2_f32_slice(l, false, data),
                3 => self.gl.uniform_matrix_3_f32_slice(l, false, data),
                _ => self.gl.uniform_matrix_4_f32_slice(l, false, data),
            }
        }
    }

    fn version_string(&mut self) -> String {
        unsafe { self.gl.get_parameter_string(glow::VERSION) }
    }
    fn error(&mut self) -> u32 {
        unsafe { self.gl.get_error() }
    }
    fn flush(&mut self) {
        unsafe { self.gl.flush() }
    }

    fn handle_context_lost(&mut self) {
        // every name is gone with the context
        self.buffers.clear();
        self.textures.clear();
        self.framebuffers.clear();
        self.renderbuffers.clear();
        self.shaders.clear();
        self.programs.clear();
        self.uniforms.clear();
    }
}
