// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The execution layer of accelerated_graphics: everything that issues native calls. */

pub mod context;
pub(crate) mod materialize;
pub mod native;
pub mod render_pass;
pub mod render_thread;
pub mod shader;
pub mod state;
pub mod vertex_layout;

pub use context::{Context, ContextConfig};
pub use native::Stats;
pub use render_thread::ThreadPolicy;

/// Errors a context reports instead of drawing.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shader(#[from] shader::ShaderError),
}
