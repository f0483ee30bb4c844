use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::TextureError;

use super::{Capabilities, DeviceInit, SurfaceErrorAction};

/// Window-bound wgpu device.
///
/// Creates the device with the bindless feature set when requested, owns
/// the swapchain surface, and hands out one `GpuFrame` per redraw. Image
/// storage does not live here: an `ImageStore` over a `WgpuBackend` clones
/// `device()` and `queue()`.
pub struct Gpu<'w> {
    /// Borrows the window; the runtime keeps both in one self-referencing entry.
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    capabilities: Capabilities,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

/// One acquired swapchain image with its encoder.
///
/// Presented when handed back to `Gpu::submit`. Hold it only for the frame:
/// the next acquisition waits for it.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl<'w> Gpu<'w> {
    /// Creates the device and surface for `window`.
    ///
    /// With `init.require_bindless`, an adapter without bindless residency is
    /// rejected with `TextureError::UnsupportedCapability` before any device
    /// exists.
    pub async fn new(window: &'w Window, init: DeviceInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        let (device, queue) = request_device(&adapter, &init).await?;
        let capabilities = Capabilities::from_device(&device);

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, init.prefer_srgb)
            .context("surface reports no formats")?;
        let alpha_mode = init
            .alpha_mode
            .filter(|m| surface_caps.alpha_modes.contains(m))
            .or_else(|| surface_caps.alpha_modes.first().copied())
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::info!("surface {format:?} {}x{}", size.width, size.height);

        Ok(Gpu {
            surface,
            device,
            queue,
            capabilities,
            config,
            size,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// What the created device actually enabled.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Tracks the new window size; a zero-area window keeps the old
    /// configuration until it becomes visible again.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bindless frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands and presents it.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    /// Maps an acquisition failure to what the caller should do next.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        log::debug!("surface error: {err}");
        match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                if self.size.width > 0 && self.size.height > 0 {
                    self.surface.configure(&self.device, &self.config);
                }
                SurfaceErrorAction::Reconfigured
            }
            SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            SurfaceError::Timeout | SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

/// Requests the logical device, adding the bindless feature set and raising
/// the binding-array limit when `init.require_bindless` is set.
async fn request_device(
    adapter: &wgpu::Adapter,
    init: &DeviceInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let info = adapter.get_info();
    let adapter_limits = adapter.limits();
    let adapter_caps = Capabilities::from_wgpu(adapter.features(), &adapter_limits);
    log::info!(
        "adapter: {} ({:?}), bindless residency: {}",
        info.name,
        info.backend,
        adapter_caps.bindless_residency,
    );

    let mut required_features = init.required_features;
    let mut required_limits = init.required_limits.clone();
    if init.require_bindless {
        if !adapter_caps.bindless_residency {
            return Err(anyhow::Error::new(TextureError::UnsupportedCapability(
                "bindless texture residency",
            ))
            .context(format!("adapter {} cannot sample textures through handles", info.name)));
        }
        required_features |= Capabilities::bindless_features();
        required_limits.max_binding_array_elements_per_shader_stage =
            adapter_limits.max_binding_array_elements_per_shader_stage;
    }

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("bindless-engine device"),
            required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}

/// Picks a surface format whose sRGB-ness matches `prefer_srgb`, falling
/// back to the first reported format.
fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    caps.formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| caps.formats.first().copied())
}
