/*! Backend-agnostic resource handles. */

pub mod buffer;
pub mod frame_buffer;
pub mod resource;
pub mod sampler;
pub mod texture;
pub mod uniforms;
