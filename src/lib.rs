/*! accelerated_graphics is a graphics acceleration layer between a retained-mode renderer and
an immediate-mode, OpenGL-class native API.

Upper layers describe buffers, textures, framebuffers, shader programs and draw calls in
backend-agnostic terms.  A [Context](images::Context) turns them into the smallest correctly
ordered stream of native calls it can:

| Concern              | Handle side                                  | Context side                                            |
|----------------------|----------------------------------------------|---------------------------------------------------------|
| Buffers and textures | [bindings::buffer], [bindings::texture]      | Created on first use, re-uploaded when the version moves |
| Render targets       | [bindings::frame_buffer]                     | Storage rebuilt only when the geometry really changed    |
| Programs             | [images::shader::Program]                    | Compiled once per `(program, variant)`                    |
| Render state         | [images::state]                              | Diffed against what the backend already has             |
| Uniforms             | [bindings::uniforms]                         | Skipped when the value did not change                   |

# Handles and contexts

Handles are cheap to clone and may be created, uploaded to and closed from any thread.  None of
that touches the GPU: a handle only records what its contents should be and bumps a version.
The context compares versions when a draw uses the handle and materializes whatever is stale.

Closing a handle queues its native objects for deletion in every context that created them.
Contexts release them at [finish](images::Context::finish), never in the middle of a frame.

# Backends

Native calls go through the [imp::Backend] trait.  [imp::recording::RecordingBackend] records
every call and is what the crate's own tests drive.  With the `backend_glow` feature,
`imp::glow::GlowBackend` drives a real OpenGL or WebGL context through [glow](https://docs.rs/glow).
*/

pub mod bindings;
pub mod images;
pub mod imp;
pub mod pixel_formats;
