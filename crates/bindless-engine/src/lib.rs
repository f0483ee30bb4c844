//! Bindless engine crate.
//!
//! Owns the device layer, the image store and the residency registry that
//! turns uploaded images into bindless handles, plus the window/GPU runtime
//! used by the demos.

pub mod device;
pub mod error;
pub mod image;
pub mod residency;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod render;

pub use error::{Result, TextureError};
