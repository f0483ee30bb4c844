//! Bindless texture example.
//!
//! Four noise textures are made resident and handed to the shader as one
//! handle array; each face of a tetrahedron selects its texture by index.

mod app;
mod geometry;
mod noise;
mod renderer;

use anyhow::Result;
use winit::dpi::LogicalSize;

use bindless_engine::device::DeviceInit;
use bindless_engine::logging::{init_logging, LoggingConfig};
use bindless_engine::window::{Runtime, RuntimeConfig};

use crate::app::BindlessApp;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    log::info!("Usage:");
    log::info!("\tESC\t\tClose example");
    log::info!("\tSpace\t\tReset camera orbit");

    let config = RuntimeConfig {
        title: "Bindless Texture Example".to_string(),
        initial_size: LogicalSize::new(1024.0, 768.0),
    };

    // Noise bytes are shown as-is, without an sRGB encode on write.
    let device_init = DeviceInit {
        prefer_srgb: false,
        require_bindless: true,
        ..Default::default()
    };

    Runtime::run(config, device_init, BindlessApp::new())
}
