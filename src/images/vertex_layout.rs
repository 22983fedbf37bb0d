// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vertex buffer layout descriptions.
//!
//! A [VertexLayout] describes how the bytes of one vertex buffer are split into shader
//! attributes.  A draw takes a list of [VertexData], each pairing a buffer with its layout,
//! so positions and per-instance data can live in separate buffers.
//!
//! # Example
//!
//! ```
//! use accelerated_graphics::images::vertex_layout::{VertexAttribute, VertexFieldType, VertexLayout};
//!
//! let layout = VertexLayout::new()
//!     .with(VertexAttribute::new("a_pos", 0, VertexFieldType::F32, 2))
//!     .with(VertexAttribute::new("a_col", 1, VertexFieldType::U8, 4).normalized());
//! assert_eq!(layout.stride(), 12);
//! assert_eq!(layout.offsets(), vec![0, 8]);
//! ```

use crate::bindings::buffer::Buffer;
use crate::imp::gl_enums;

/// Element type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFieldType {
    F32,
    I32,
    U32,
    I16,
    U16,
    I8,
    U8,
}

impl VertexFieldType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            VertexFieldType::F32 | VertexFieldType::I32 | VertexFieldType::U32 => 4,
            VertexFieldType::I16 | VertexFieldType::U16 => 2,
            VertexFieldType::I8 | VertexFieldType::U8 => 1,
        }
    }

    pub(crate) fn gl(self) -> u32 {
        match self {
            VertexFieldType::F32 => gl_enums::FLOAT,
            VertexFieldType::I32 => gl_enums::INT,
            VertexFieldType::U32 => gl_enums::UNSIGNED_INT,
            VertexFieldType::I16 => gl_enums::SHORT,
            VertexFieldType::U16 => gl_enums::UNSIGNED_SHORT,
            VertexFieldType::I8 => gl_enums::BYTE,
            VertexFieldType::U8 => gl_enums::UNSIGNED_BYTE,
        }
    }
}

/// One shader attribute inside a vertex.
///
/// The attribute is bound at `location`, which is also the location the program binds
/// `name` to before linking.  Attributes with a `divisor` other than `0` advance once per
/// `divisor` instances instead of once per vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub name: String,
    pub location: Option<u32>,
    pub ty: VertexFieldType,
    pub components: u8,
    pub normalized: bool,
    pub divisor: u32,
    /// Inactive attributes still take up space in the vertex but are never bound.
    pub active: bool,
}

impl VertexAttribute {
    pub fn new(name: &str, location: u32, ty: VertexFieldType, components: u8) -> Self {
        assert!(
            (1..=4).contains(&components),
            "attribute {name} has {components} components"
        );
        VertexAttribute {
            name: name.to_string(),
            location: Some(location),
            ty,
            components,
            normalized: false,
            divisor: 0,
            active: true,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Bytes the attribute occupies.
    pub fn size(&self) -> usize {
        self.ty.size() * self.components as usize
    }
}

/// The attributes of one vertex, in memory order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attribute: VertexAttribute) {
        self.attributes.push(attribute);
    }

    pub fn with(mut self, attribute: VertexAttribute) -> Self {
        self.add(attribute);
        self
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Byte offset of each attribute.  Every attribute starts at a multiple of its element size.
    pub fn offsets(&self) -> Vec<usize> {
        self.placed().map(|(offset, _)| offset).collect()
    }

    /// Each attribute paired with its byte offset, without allocating.
    pub fn placed(&self) -> impl Iterator<Item = (usize, &VertexAttribute)> + '_ {
        let mut offset: usize = 0;
        self.attributes.iter().map(move |a| {
            offset = offset.next_multiple_of(a.ty.size());
            let this = offset;
            offset += a.size();
            (this, a)
        })
    }

    /// Bytes per vertex, padded to a multiple of the largest element size.
    pub fn stride(&self) -> usize {
        let end = self
            .attributes
            .iter()
            .fold(0, |offset: usize, a| offset.next_multiple_of(a.ty.size()) + a.size());
        let align = self.attributes.iter().map(|a| a.ty.size()).max().unwrap_or(1);
        end.next_multiple_of(align)
    }
}

/// A vertex buffer and the layout of the vertices in it.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    pub buffer: Buffer,
    pub layout: VertexLayout,
}

impl VertexData {
    pub fn new(buffer: Buffer, layout: VertexLayout) -> Self {
        VertexData { buffer, layout }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_respect_element_alignment() {
        let layout = VertexLayout::new()
            .with(VertexAttribute::new("a", 0, VertexFieldType::U8, 3))
            .with(VertexAttribute::new("b", 1, VertexFieldType::F32, 1))
            .with(VertexAttribute::new("c", 2, VertexFieldType::U16, 1));
        assert_eq!(layout.offsets(), vec![0, 4, 8]);
        assert_eq!(layout.stride(), 12);
    }

    #[test]
    fn placed_pairs_offsets_with_attributes() {
        let layout = VertexLayout::new()
            .with(VertexAttribute::new("a", 0, VertexFieldType::I16, 1))
            .with(VertexAttribute::new("b", 1, VertexFieldType::F32, 2));
        let placed: Vec<(usize, &str)> = layout.placed().map(|(o, a)| (o, a.name.as_str())).collect();
        assert_eq!(placed, [(0, "a"), (4, "b")]);
    }

    #[test]
    fn empty_layout_has_no_stride() {
        assert_eq!(VertexLayout::new().stride(), 0);
    }

    #[test]
    #[should_panic]
    fn five_components_rejected() {
        VertexAttribute::new("a", 0, VertexFieldType::F32, 5);
    }
}
