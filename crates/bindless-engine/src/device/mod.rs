//! Device layer.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue and the window surface
//! - querying device capabilities once and caching them
//! - the `DeviceContext`: single-threaded owner of a `DeviceBackend` and of
//!   the explicit "bound image per target" table

mod caps;
mod context;
mod error;
mod gpu;
mod host;
mod init;
mod wgpu_backend;

pub use caps::Capabilities;
pub use context::{DeviceBackend, DeviceContext};
pub use error::{DeviceError, DeviceResult, SurfaceErrorAction};
pub use gpu::{Gpu, GpuFrame};
pub use host::{HostBackend, HostImage};
pub use init::DeviceInit;
pub use wgpu_backend::{WgpuBackend, WgpuImage};
