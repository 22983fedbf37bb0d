// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Descriptions of the work a context replays: draws, clears and readbacks.

Commands hold clones of the handles they reference, so a command can be built on any thread and
handed to the render thread.
*/

use crate::bindings::buffer::Buffer;
use crate::bindings::frame_buffer::FrameBuffer;
use crate::bindings::uniforms::UniformValues;
use crate::images::shader::Program;
use crate::images::state::{
    Blending, ColorMask, CullFace, DepthAndFrontFace, Scissor, StencilOpFunc, StencilReference,
};
use crate::images::vertex_layout::VertexData;
use crate::imp::gl_enums;
use crate::pixel_formats::Float4;

/// Primitive assembly mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawType {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawType {
    pub(crate) fn gl(self) -> u32 {
        match self {
            DrawType::Points => gl_enums::POINTS,
            DrawType::Lines => gl_enums::LINES,
            DrawType::LineStrip => gl_enums::LINE_STRIP,
            DrawType::LineLoop => gl_enums::LINE_LOOP,
            DrawType::Triangles => gl_enums::TRIANGLES,
            DrawType::TriangleStrip => gl_enums::TRIANGLE_STRIP,
            DrawType::TriangleFan => gl_enums::TRIANGLE_FAN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    U8,
    #[default]
    U16,
    U32,
}

impl IndexType {
    pub(crate) fn gl(self) -> u32 {
        match self {
            IndexType::U8 => gl_enums::UNSIGNED_BYTE,
            IndexType::U16 => gl_enums::UNSIGNED_SHORT,
            IndexType::U32 => gl_enums::UNSIGNED_INT,
        }
    }

    pub fn size(self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// One draw call and every piece of state it depends on.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub frame_buffer: FrameBuffer,
    pub program: Program,
    pub vertex_data: Vec<VertexData>,
    pub draw_type: DrawType,
    pub vertex_count: u32,
    pub indices: Option<Buffer>,
    pub index_type: IndexType,
    /// First vertex for non-indexed draws, byte offset into `indices` otherwise.
    pub offset: u32,
    pub blending: Blending,
    pub uniforms: UniformValues,
    pub stencil_op_func: StencilOpFunc,
    pub stencil_reference: StencilReference,
    pub color_mask: ColorMask,
    pub depth_and_front_face: DepthAndFrontFace,
    /// [Scissor::NIL] falls back to the framebuffer's scissor.
    pub scissor: Scissor,
    pub cull_face: CullFace,
    pub instances: u32,
}

impl DrawCommand {
    /// A non-indexed, single-instance draw with default state.
    pub fn new(
        frame_buffer: &FrameBuffer,
        program: &Program,
        vertex_data: Vec<VertexData>,
        draw_type: DrawType,
        vertex_count: u32,
    ) -> Self {
        DrawCommand {
            frame_buffer: frame_buffer.clone(),
            program: program.clone(),
            vertex_data,
            draw_type,
            vertex_count,
            indices: None,
            index_type: IndexType::default(),
            offset: 0,
            blending: Blending::NONE,
            uniforms: UniformValues::new(),
            stencil_op_func: StencilOpFunc::DISABLED,
            stencil_reference: StencilReference::DEFAULT,
            color_mask: ColorMask::ALL_ENABLED,
            depth_and_front_face: DepthAndFrontFace::DEFAULT,
            scissor: Scissor::NIL,
            cull_face: CullFace::None,
            instances: 1,
        }
    }

    pub fn with_indices(mut self, indices: &Buffer, index_type: IndexType) -> Self {
        self.indices = Some(indices.clone());
        self.index_type = index_type;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    pub fn with_uniforms(mut self, uniforms: UniformValues) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_stencil(mut self, op_func: StencilOpFunc, reference: StencilReference) -> Self {
        self.stencil_op_func = op_func;
        self.stencil_reference = reference;
        self
    }

    pub fn with_color_mask(mut self, color_mask: ColorMask) -> Self {
        self.color_mask = color_mask;
        self
    }

    pub fn with_depth(mut self, depth: DepthAndFrontFace) -> Self {
        self.depth_and_front_face = depth;
        self
    }

    pub fn with_scissor(mut self, scissor: Scissor) -> Self {
        self.scissor = scissor;
        self
    }

    pub fn with_cull_face(mut self, cull_face: CullFace) -> Self {
        self.cull_face = cull_face;
        self
    }

    pub fn with_instances(mut self, instances: u32) -> Self {
        self.instances = instances;
        self
    }
}

/// Clears any combination of a framebuffer's color, depth and stencil.
#[derive(Debug, Clone)]
pub struct ClearCommand {
    pub frame_buffer: FrameBuffer,
    pub color: Option<Float4>,
    pub depth: Option<f32>,
    pub stencil: Option<i32>,
    pub scissor: Scissor,
}

impl ClearCommand {
    /// Clears nothing until one of the `with_*` methods is used.
    pub fn new(frame_buffer: &FrameBuffer) -> Self {
        ClearCommand {
            frame_buffer: frame_buffer.clone(),
            color: None,
            depth: None,
            stencil: None,
            scissor: Scissor::NIL,
        }
    }

    pub fn with_color(mut self, color: Float4) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_stencil(mut self, stencil: i32) -> Self {
        self.stencil = Some(stencil);
        self
    }

    pub fn with_scissor(mut self, scissor: Scissor) -> Self {
        self.scissor = scissor;
        self
    }
}

/// Which framebuffer plane a readback reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadKind {
    /// RGBA8, one packed `u32` per pixel.
    Color,
    /// One `f32` per pixel.
    Depth,
    /// One byte per pixel.
    Stencil,
}

impl ReadKind {
    /// `(format, type, bytes per pixel)`
    pub(crate) fn gl(self) -> (u32, u32, usize) {
        match self {
            ReadKind::Color => (gl_enums::RGBA, gl_enums::UNSIGNED_BYTE, 4),
            ReadKind::Depth => (gl_enums::DEPTH_COMPONENT, gl_enums::FLOAT, 4),
            ReadKind::Stencil => (gl_enums::STENCIL_INDEX, gl_enums::UNSIGNED_BYTE, 1),
        }
    }
}

/// Caller storage for a readback.
#[derive(Debug)]
pub enum ReadBuffer<'a> {
    Int(&'a mut [u32]),
    Float(&'a mut [f32]),
    Byte(&'a mut [u8]),
}

impl ReadBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            ReadBuffer::Int(b) => b.len(),
            ReadBuffer::Float(b) => b.len(),
            ReadBuffer::Byte(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The storage as bytes.
    ///
    /// # Panics
    /// If this is not the storage kind `kind` reads into.
    pub(crate) fn bytes_for(&mut self, kind: ReadKind) -> &mut [u8] {
        match (kind, self) {
            // SAFETY: u32 and f32 have no invalid bit patterns and no padding.
            (ReadKind::Color, ReadBuffer::Int(b)) => unsafe {
                std::slice::from_raw_parts_mut(b.as_mut_ptr() as *mut u8, std::mem::size_of_val(&**b))
            },
            (ReadKind::Depth, ReadBuffer::Float(b)) => unsafe {
                std::slice::from_raw_parts_mut(b.as_mut_ptr() as *mut u8, std::mem::size_of_val(&**b))
            },
            (ReadKind::Stencil, ReadBuffer::Byte(b)) => b,
            (kind, other) => panic!("{kind:?} cannot be read into {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_buffer_kinds_must_match() {
        let mut storage = [0u32; 4];
        let mut buffer = ReadBuffer::Int(&mut storage);
        assert_eq!(buffer.bytes_for(ReadKind::Color).len(), 16);
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buffer.bytes_for(ReadKind::Depth).len()
        }));
        assert!(r.is_err());
    }

    #[test]
    fn draw_defaults_are_single_instance() {
        let command = DrawCommand::new(
            &FrameBuffer::new(),
            &Program::new("p", "", ""),
            Vec::new(),
            DrawType::Triangles,
            3,
        );
        assert_eq!(command.instances, 1);
        assert!(command.scissor.is_nil());
        assert!(!command.blending.enabled());
    }
}
