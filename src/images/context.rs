// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The graphics context: the one object that talks to a [Backend].

A [Context] owns its backend, its native-resource table and its state cache.  Handles are shared
freely between threads, but a context is driven from one render thread; see [ThreadPolicy].

```
use accelerated_graphics::bindings::buffer::Buffer;
use accelerated_graphics::bindings::frame_buffer::FrameBuffer;
use accelerated_graphics::images::Context;
use accelerated_graphics::images::render_pass::{ClearCommand, DrawCommand, DrawType};
use accelerated_graphics::images::shader::Program;
use accelerated_graphics::images::vertex_layout::{VertexAttribute, VertexData, VertexFieldType, VertexLayout};
use accelerated_graphics::imp::recording::RecordingBackend;
use accelerated_graphics::pixel_formats::Float4;

let mut context = Context::new(RecordingBackend::new());
let target = FrameBuffer::new();
target.set_size(64, 64);

let layout = VertexLayout::new().with(VertexAttribute::new("a_pos", 0, VertexFieldType::F32, 2));
let program = Program::for_layout("flat", "void main(){}", "void main(){}", &layout);
let vertices = Buffer::new("triangle");
vertices.upload_slice(&[0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0]);

context.start_frame();
context.clear(&ClearCommand::new(&target).with_color(Float4::BLACK));
context
    .draw(&DrawCommand::new(&target, &program, vec![VertexData::new(vertices, layout)], DrawType::Triangles, 3))
    .unwrap();
context.end_frame();
context.finish();
```
*/

use crate::bindings::frame_buffer::FrameBuffer;
use crate::bindings::sampler::TextureUnit;
use crate::bindings::texture::{Texture, TextureTarget};
use crate::bindings::uniforms::{Uniform, UniformPayloadRef, UniformValue};
use crate::images::Error;
use crate::images::materialize;
use crate::images::native::{NativeTable, Stats};
use crate::images::render_pass::{ClearCommand, DrawCommand, ReadBuffer, ReadKind};
use crate::images::render_thread::{RenderThread, ThreadPolicy};
use crate::images::shader::{
    CompiledProgram, GlslConfig, GlslProgramCompiler, Program, ProgramCompiler, ProgramConfig,
};
use crate::images::state::{ColorMask, Scissor, StateCache};
use crate::images::vertex_layout::VertexData;
use crate::imp::{Backend, NativeId, gl_enums};
use crate::pixel_formats::Bitmap;
use logwise::privacy::LogIt;

/// Runtime options of a [Context].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub thread_policy: ThreadPolicy,
    /// Float bitmaps get a float internal format.  Turn off where float textures are missing.
    pub float_textures: bool,
    /// Set the unpack byte-order pixel-store flags before every texture upload.
    pub unpack_byte_swap: bool,
    /// Texture unit used while building framebuffer color textures.
    pub scratch_texture_unit: u32,
    pub glsl: GlslConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            thread_policy: ThreadPolicy::Panic,
            float_textures: true,
            unpack_byte_swap: false,
            scratch_texture_unit: 7,
            glsl: GlslConfig::default(),
        }
    }
}

/// Disables every attribute a draw enabled, even if the draw unwinds.
struct AttributeTeardown<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
    vertex_data: &'a [VertexData],
}

impl<B: Backend + ?Sized> Drop for AttributeTeardown<'_, B> {
    fn drop(&mut self) {
        for attribute in self.vertex_data.iter().flat_map(|d| d.layout.attributes()) {
            let Some(location) = attribute.location.filter(|_| attribute.active) else {
                continue;
            };
            if attribute.divisor != 0 {
                self.backend.vertex_attrib_divisor(location, 0);
            }
            self.backend.disable_vertex_attrib_array(location);
        }
    }
}

#[derive(Debug)]
pub struct Context<B: Backend> {
    backend: B,
    config: ContextConfig,
    compiler: Box<dyn ProgramCompiler>,
    table: NativeTable,
    cache: StateCache,
    render_thread: RenderThread,
    /// Native framebuffer bound when the frame started.
    main_binding: NativeId,
}

impl<B: Backend> Context<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ContextConfig::default())
    }

    pub fn with_config(backend: B, config: ContextConfig) -> Self {
        Context {
            backend,
            compiler: Box::new(GlslProgramCompiler::new(config.glsl.clone())),
            render_thread: RenderThread::new(config.thread_policy),
            config,
            table: NativeTable::new(),
            cache: StateCache::new(),
            main_binding: 0,
        }
    }

    /// Replaces the default GLSL compiler.
    pub fn with_compiler(mut self, compiler: impl ProgramCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn stats(&self) -> Stats {
        self.table.stats()
    }

    /// Forgets cached state and captures the current native binding as the main framebuffer.
    pub fn start_frame(&mut self) {
        self.render_thread.check("start_frame");
        self.cache.invalidate();
        self.main_binding = self.backend.framebuffer_binding();
        self.cache.note_framebuffer(self.main_binding);
    }

    /// Rebinds the main framebuffer.
    pub fn end_frame(&mut self) {
        self.render_thread.check("end_frame");
        self.cache.bind_framebuffer(&mut self.backend, self.main_binding);
    }

    pub fn flush(&mut self) {
        self.render_thread.check("flush");
        self.backend.flush();
    }

    /// Flushes, then releases every resource closed since the last finish.
    pub fn finish(&mut self) {
        self.flush();
        let drained = self.table.drain_deletions(&mut self.backend);
        if drained > 0 {
            logwise::trace_sync!("Released {count} closed resources", count = drained);
        }
    }

    /// The native context was lost along with every object in it.
    ///
    /// Nothing is deleted; every handle materializes again on its next use.
    pub fn context_lost(&mut self) {
        self.render_thread.check("context_lost");
        logwise::info_sync!("Context lost; invalidating native state");
        self.backend.handle_context_lost();
        self.table.forget_all();
        self.cache.invalidate();
        self.main_binding = 0;
    }

    /// Deletes every compiled variant of `program`.  It compiles again if drawn later.
    pub fn delete_program(&mut self, program: &Program) {
        self.render_thread.check("delete_program");
        for compiled in self.table.remove_programs(program.id()) {
            self.cache.forget_program(compiled.native);
            self.backend.delete_program(compiled.native);
        }
    }

    fn bind_frame_buffer(&mut self, frame_buffer: &FrameBuffer) {
        if frame_buffer.is_main() {
            self.cache.bind_framebuffer(&mut self.backend, self.main_binding);
        } else {
            materialize::bind_frame_buffer(
                &mut self.backend,
                &mut self.table,
                &mut self.cache,
                &self.config,
                frame_buffer,
            );
        }
        self.cache
            .apply_viewport(&mut self.backend, frame_buffer.width(), frame_buffer.height());
    }

    fn effective_scissor(requested: Scissor, frame_buffer: &FrameBuffer) -> Scissor {
        if requested.is_nil() {
            frame_buffer.scissor().unwrap_or(Scissor::NIL)
        } else {
            requested
        }
    }

    /// Compiles `program` for `config` unless already compiled, and makes it current.
    fn use_program(&mut self, program: &Program, config: ProgramConfig) -> Result<NativeId, Error> {
        let key = (program.id(), config);
        let native = match self.table.programs.get(&key) {
            Some(compiled) => compiled.native,
            None => {
                let native = self
                    .compiler
                    .compile(&mut self.backend, program, config)
                    .inspect_err(|e| {
                        logwise::error_sync!("Program {name} failed: {err}", name = LogIt(program.name()), err = LogIt(e));
                    })?;
                self.table.link(program.core());
                self.table.programs.insert(key, CompiledProgram::new(native));
                native
            }
        };
        self.cache.use_program(&mut self.backend, native);
        Ok(native)
    }

    /// Replays one draw.
    ///
    /// Fails only if the program cannot be compiled, in which case nothing is drawn.
    pub fn draw(&mut self, command: &DrawCommand) -> Result<(), Error> {
        self.render_thread.check("draw");
        self.bind_frame_buffer(&command.frame_buffer);
        let scissor = Self::effective_scissor(command.scissor, &command.frame_buffer);
        self.cache.apply_scissor(&mut self.backend, scissor);

        let external = command.uniforms.texture_units().any(|unit| {
            unit.texture
                .as_ref()
                .is_some_and(|t| t.bind_target() == TextureTarget::External)
        });
        let config = if external {
            ProgramConfig::EXTERNAL_TEXTURE_SAMPLER
        } else {
            ProgramConfig::DEFAULT
        };
        self.use_program(&command.program, config)?;
        let key = (command.program.id(), config);

        let Context {
            backend,
            config: context_config,
            table,
            cache,
            ..
        } = self;
        let mut teardown = AttributeTeardown {
            backend,
            vertex_data: &command.vertex_data,
        };
        for data in &command.vertex_data {
            materialize::bind_buffer(&mut *teardown.backend, table, &data.buffer, gl_enums::ARRAY_BUFFER);
            let stride = data.layout.stride() as i32;
            for (offset, attribute) in data.layout.placed() {
                let Some(location) = attribute.location.filter(|_| attribute.active) else {
                    continue;
                };
                teardown.backend.enable_vertex_attrib_array(location);
                teardown.backend.vertex_attrib_pointer(
                    location,
                    attribute.components as i32,
                    attribute.ty.gl(),
                    attribute.normalized,
                    stride,
                    offset as i32,
                );
                if attribute.divisor != 0 {
                    teardown.backend.vertex_attrib_divisor(location, attribute.divisor);
                }
            }
        }
        let backend = &mut *teardown.backend;

        let mut next_unit = 0;
        for (uniform, value) in command.uniforms.iter() {
            let mut sampler_unit = 0;
            let sampler_index: i32;
            let location = match table.programs.get_mut(&key) {
                Some(compiled) => compiled.uniform_location(backend, uniform),
                None => -1,
            };
            let payload = match value {
                UniformValue::Floats(data) => UniformPayloadRef::Floats(data),
                UniformValue::Ints(data) => UniformPayloadRef::Ints(data),
                UniformValue::Sampler(unit) => {
                    let index = unit.index.unwrap_or(next_unit);
                    next_unit = index + 1;
                    sampler_unit = index;
                    if location >= 0 {
                        bind_texture_unit(backend, table, cache, context_config, index, unit);
                    }
                    sampler_index = index as i32;
                    UniformPayloadRef::Ints(std::slice::from_ref(&sampler_index))
                }
            };
            if location < 0 {
                continue;
            }
            let changed = table
                .programs
                .get_mut(&key)
                .is_some_and(|compiled| compiled.replace_value(uniform, payload));
            if changed {
                set_uniform(backend, location, uniform, value, sampler_unit);
            }
        }

        cache.apply_blending(backend, command.blending);
        cache.apply_depth_and_front_face(backend, command.depth_and_front_face);
        cache.apply_cull_face(backend, command.cull_face);
        cache.apply_color_mask(backend, command.color_mask);
        cache.apply_stencil(backend, command.stencil_op_func, command.stencil_reference);

        let mode = command.draw_type.gl();
        let count = command.vertex_count as i32;
        let offset = command.offset as i32;
        let instances = command.instances as i32;
        match &command.indices {
            Some(indices) => {
                materialize::bind_buffer(backend, table, indices, gl_enums::ELEMENT_ARRAY_BUFFER);
                let index_type = command.index_type.gl();
                if command.instances != 1 {
                    backend.draw_elements_instanced(mode, count, index_type, offset, instances);
                } else {
                    backend.draw_elements(mode, count, index_type, offset);
                }
            }
            None => {
                if command.instances != 1 {
                    backend.draw_arrays_instanced(mode, offset, count, instances);
                } else {
                    backend.draw_arrays(mode, offset, count);
                }
            }
        }
        drop(teardown);
        Ok(())
    }

    /// Clears the requested planes of a framebuffer.
    pub fn clear(&mut self, command: &ClearCommand) {
        self.render_thread.check("clear");
        self.bind_frame_buffer(&command.frame_buffer);
        let scissor = Self::effective_scissor(command.scissor, &command.frame_buffer);
        self.cache.apply_scissor(&mut self.backend, scissor);
        let mut mask = 0;
        if let Some(color) = command.color {
            self.cache.apply_color_mask(&mut self.backend, ColorMask::ALL_ENABLED);
            self.backend.clear_color(color.r, color.g, color.b, color.a);
            mask |= gl_enums::COLOR_BUFFER_BIT;
        }
        if let Some(depth) = command.depth {
            self.cache.apply_depth_mask(&mut self.backend, true);
            self.backend.clear_depth(depth);
            mask |= gl_enums::DEPTH_BUFFER_BIT;
        }
        if let Some(stencil) = command.stencil {
            self.cache.apply_stencil_write_mask(&mut self.backend, u32::MAX);
            self.backend.clear_stencil(stencil);
            mask |= gl_enums::STENCIL_BUFFER_BIT;
        }
        if mask != 0 {
            self.backend.clear(mask);
        }
    }

    /// Reads a `width`x`height` region of `frame_buffer` into `out`.
    ///
    /// # Panics
    /// If `out` is not the storage kind for `kind` (`Int` for color, `Float` for depth, `Byte`
    /// for stencil) or holds fewer than `width * height` elements.
    pub fn read_to_memory(
        &mut self,
        frame_buffer: &FrameBuffer,
        kind: ReadKind,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        mut out: ReadBuffer<'_>,
    ) {
        self.render_thread.check("read_to_memory");
        let pixels = width as usize * height as usize;
        assert!(
            out.len() >= pixels,
            "readback of {width}x{height} needs {pixels} elements, storage holds {}",
            out.len()
        );
        self.bind_frame_buffer(frame_buffer);
        let (format, ty, bytes_per_pixel) = kind.gl();
        let bytes = out.bytes_for(kind);
        self.backend.read_pixels(
            x,
            y,
            width as i32,
            height as i32,
            format,
            ty,
            &mut bytes[..pixels * bytes_per_pixel],
        );
    }

    /// Copies a region of `frame_buffer` into `texture`, replacing its contents.
    pub fn read_to_texture(
        &mut self,
        frame_buffer: &FrameBuffer,
        texture: &Texture,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) {
        self.render_thread.check("read_to_texture");
        self.bind_frame_buffer(frame_buffer);
        self.cache.apply_scissor(&mut self.backend, Scissor::NIL);
        if (texture.width(), texture.height()) != (width, height) {
            texture.upload(Bitmap::empty(width, height), false);
        }
        let previous_unit = self
            .cache
            .select_texture_unit(&mut self.backend, self.config.scratch_texture_unit);
        materialize::bind_texture(&mut self.backend, &mut self.table, &self.config, texture);
        self.backend.copy_tex_image_2d(
            gl_enums::TEXTURE_2D,
            0,
            gl_enums::RGBA,
            x,
            y,
            width as i32,
            height as i32,
        );
        self.backend.bind_texture(gl_enums::TEXTURE_2D, 0);
        if let Some(unit) = previous_unit {
            self.cache.select_texture_unit(&mut self.backend, unit);
        }
    }
}

/// Binds `unit`'s texture (or nothing) to texture unit `index` and applies its sampling state.
fn bind_texture_unit<B: Backend + ?Sized>(
    backend: &mut B,
    table: &mut NativeTable,
    cache: &mut StateCache,
    config: &ContextConfig,
    index: u32,
    unit: &TextureUnit,
) {
    cache.select_texture_unit(backend, index);
    let Some(texture) = &unit.texture else {
        backend.bind_texture(gl_enums::TEXTURE_2D, 0);
        return;
    };
    let bound = materialize::bind_texture(backend, table, config, texture);
    let target = bound.target.gl();
    let wrap = unit.wrap.gl() as i32;
    backend.tex_parameter(target, gl_enums::TEXTURE_WRAP_S, wrap);
    backend.tex_parameter(target, gl_enums::TEXTURE_WRAP_T, wrap);
    if bound.target.dims() >= 3 {
        backend.tex_parameter(target, gl_enums::TEXTURE_WRAP_R, wrap);
    }
    let (min, mag) = unit.filters(bound.mipmaps);
    backend.tex_parameter(target, gl_enums::TEXTURE_MIN_FILTER, min as i32);
    backend.tex_parameter(target, gl_enums::TEXTURE_MAG_FILTER, mag as i32);
}

fn set_uniform<B: Backend + ?Sized>(
    backend: &mut B,
    location: i32,
    uniform: &Uniform,
    value: &UniformValue,
    sampler_unit: u32,
) {
    let count = uniform.array_count() as i32;
    let components = uniform.ty().element_count() as u8;
    match value {
        UniformValue::Floats(data) => match uniform.ty().matrix_dimension() {
            Some(dimension) => backend.uniform_matrix_f32(location, dimension, count, data),
            None => backend.uniform_f32(location, components, count, data),
        },
        UniformValue::Ints(data) => backend.uniform_i32(location, components, count, data),
        UniformValue::Sampler(_) => backend.uniform_i32(location, 1, 1, &[sampler_unit as i32]),
    }
}
