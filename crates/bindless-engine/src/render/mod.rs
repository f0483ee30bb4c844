//! GPU rendering glue.
//!
//! Renderers receive a `RenderCtx` (device/queue + surface format) and a
//! `RenderTarget` (encoder + color view) for each frame. Handle sets reach
//! shaders through `HandleArrayBinding`.

mod ctx;
mod handle_array;

pub use ctx::{RenderCtx, RenderTarget};
pub use handle_array::HandleArrayBinding;
