// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Uniform declarations and the per-draw values assigned to them.

```
use accelerated_graphics::bindings::uniforms::{Uniform, UniformValue, UniformValues, VarType};

let tint = Uniform::new("u_tint", VarType::Float4);
let mut values = UniformValues::new();
values.set(&tint, UniformValue::Floats(vec![1.0, 0.5, 0.5, 1.0]));
values.set(&tint, UniformValue::Floats(vec![1.0, 1.0, 1.0, 1.0]));
assert_eq!(values.len(), 1);
```
*/

use crate::bindings::sampler::TextureUnit;
use std::sync::Arc;

/// Shader-visible type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Float1,
    Float2,
    Float3,
    Float4,
    Int1,
    Int2,
    Int3,
    Int4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
}

impl VarType {
    /// Scalars per element: vector width, or `dim * dim` for matrices.
    pub fn element_count(self) -> usize {
        match self {
            VarType::Float1 | VarType::Int1 | VarType::Sampler2D | VarType::SamplerCube => 1,
            VarType::Float2 | VarType::Int2 => 2,
            VarType::Float3 | VarType::Int3 => 3,
            VarType::Float4 | VarType::Int4 | VarType::Mat2 => 4,
            VarType::Mat3 => 9,
            VarType::Mat4 => 16,
        }
    }

    /// Matrix dimension, for matrix types.
    pub fn matrix_dimension(self) -> Option<u8> {
        match self {
            VarType::Mat2 => Some(2),
            VarType::Mat3 => Some(3),
            VarType::Mat4 => Some(4),
            _ => None,
        }
    }

    pub fn is_sampler(self) -> bool {
        matches!(self, VarType::Sampler2D | VarType::SamplerCube)
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            VarType::Float1
                | VarType::Float2
                | VarType::Float3
                | VarType::Float4
                | VarType::Mat2
                | VarType::Mat3
                | VarType::Mat4
        )
    }
}

/// A named uniform declaration.  Two uniforms are the same uniform when name, type and array
/// size agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uniform {
    name: Arc<str>,
    ty: VarType,
    array_count: u32,
}

impl Uniform {
    pub fn new(name: &str, ty: VarType) -> Self {
        Self::array(name, ty, 1)
    }

    pub fn array(name: &str, ty: VarType, array_count: u32) -> Self {
        assert!(array_count > 0, "uniform {name} declared with zero elements");
        Uniform {
            name: Arc::from(name),
            ty,
            array_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> VarType {
        self.ty
    }

    pub fn array_count(&self) -> u32 {
        self.array_count
    }

    /// Scalars a value for this uniform must hold.
    pub fn scalar_count(&self) -> usize {
        self.ty.element_count() * self.array_count as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
    Sampler(TextureUnit),
}

impl UniformValue {
    pub fn float(v: f32) -> Self {
        UniformValue::Floats(vec![v])
    }
    pub fn int(v: i32) -> Self {
        UniformValue::Ints(vec![v])
    }
    pub fn vec4(v: [f32; 4]) -> Self {
        UniformValue::Floats(v.to_vec())
    }
    pub fn mat4(v: [f32; 16]) -> Self {
        UniformValue::Floats(v.to_vec())
    }
}

/// The raw payload last sent to a uniform, compared bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UniformPayload {
    Floats(Vec<u32>),
    Ints(Vec<i32>),
}

/// A payload borrowed from a draw's uniform values.
#[derive(Debug, Clone, Copy)]
pub(crate) enum UniformPayloadRef<'a> {
    Floats(&'a [f32]),
    Ints(&'a [i32]),
}

impl UniformPayloadRef<'_> {
    pub(crate) fn matches(&self, stored: &UniformPayload) -> bool {
        match (self, stored) {
            (UniformPayloadRef::Floats(new), UniformPayload::Floats(old)) => {
                new.len() == old.len() && new.iter().zip(old).all(|(n, o)| n.to_bits() == *o)
            }
            (UniformPayloadRef::Ints(new), UniformPayload::Ints(old)) => *new == old.as_slice(),
            _ => false,
        }
    }

    pub(crate) fn to_payload(self) -> UniformPayload {
        match self {
            UniformPayloadRef::Floats(data) => UniformPayload::Floats(data.iter().map(|f| f.to_bits()).collect()),
            UniformPayloadRef::Ints(data) => UniformPayload::Ints(data.to_vec()),
        }
    }

    /// Writes into `stored`, reusing its allocation when the kind matches.
    pub(crate) fn overwrite(self, stored: &mut UniformPayload) {
        match (self, stored) {
            (UniformPayloadRef::Floats(new), UniformPayload::Floats(old)) => {
                old.clear();
                old.extend(new.iter().map(|f| f.to_bits()));
            }
            (UniformPayloadRef::Ints(new), UniformPayload::Ints(old)) => {
                old.clear();
                old.extend_from_slice(new);
            }
            (new, stored) => *stored = new.to_payload(),
        }
    }
}

/// An ordered set of uniform assignments.  Setting a uniform twice replaces the first value
/// in place, so application order is first-set order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformValues {
    entries: Vec<(Uniform, UniformValue)>,
}

impl UniformValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    /// If `value` does not fit `uniform`'s type or size.
    pub fn set(&mut self, uniform: &Uniform, value: UniformValue) {
        let fits = match &value {
            UniformValue::Floats(f) => uniform.ty.is_float() && f.len() == uniform.scalar_count(),
            UniformValue::Ints(i) => {
                !uniform.ty.is_float() && !uniform.ty.is_sampler() && i.len() == uniform.scalar_count()
            }
            UniformValue::Sampler(_) => uniform.ty.is_sampler(),
        };
        assert!(fits, "value {value:?} does not fit uniform {uniform:?}");
        match self.entries.iter_mut().find(|(u, _)| u == uniform) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((uniform.clone(), value)),
        }
    }

    pub fn with(mut self, uniform: &Uniform, value: UniformValue) -> Self {
        self.set(uniform, value);
        self
    }

    pub fn get(&self, uniform: &Uniform) -> Option<&UniformValue> {
        self.entries.iter().find(|(u, _)| u == uniform).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uniform, &UniformValue)> {
        self.entries.iter().map(|(u, v)| (u, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Texture units requested by sampler uniforms, in order.
    pub fn texture_units(&self) -> impl Iterator<Item = &TextureUnit> {
        self.entries.iter().filter_map(|(_, v)| match v {
            UniformValue::Sampler(unit) => Some(unit),
            _ => None,
        })
    }
}
