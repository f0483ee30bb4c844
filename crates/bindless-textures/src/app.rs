use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use bindless_engine::core::{App, AppControl, FrameCtx};
use bindless_engine::device::{DeviceContext, Gpu, WgpuBackend};
use bindless_engine::image::{Extent, ImageId, ImageStore, ImageTarget, PixelFormat};
use bindless_engine::residency::HandleSet;

use crate::noise::{noise_texture, TEXTURE_SIZE};
use crate::renderer::{TetrahedronRenderer, TEXTURE_COUNT};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.3,
    b: 0.4,
    a: 1.0,
};

/// Camera start position, looking at the origin.
const EYE: Vec3 = Vec3::new(0.0, 2.0, -2.0);

/// Radians per second.
const ORBIT_SPEED: f32 = 0.4;

/// Demo application: builds the scene on the first frame, then orbits it.
#[derive(Default)]
pub struct BindlessApp {
    scene: Option<Scene>,
    orbit: f32,
}

impl BindlessApp {
    pub fn new() -> Self {
        Self::default()
    }

    fn eye(&self) -> Vec3 {
        Quat::from_rotation_y(self.orbit) * EYE
    }
}

impl App for BindlessApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => AppControl::Exit,
            PhysicalKey::Code(KeyCode::Space) => {
                self.orbit = 0.0;
                AppControl::Continue
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.scene.is_none() {
            match Scene::new(ctx.gpu) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("failed to set up the bindless scene: {e:#}");
                    return AppControl::Exit;
                }
            }
        }

        self.orbit = (self.orbit + ctx.time.dt * ORBIT_SPEED) % std::f32::consts::TAU;
        let eye = self.eye();

        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Exit;
        };

        // Handles are checked before every draw that consumes them.
        if let Err(e) = scene.handles.validate(&scene.store) {
            log::error!("texture handles became invalid: {e}");
            return AppControl::Exit;
        }

        ctx.render(CLEAR_COLOR, |rctx, target| {
            scene.renderer.render(rctx, target, eye)
        })
    }
}

/// The four noise textures, their handles and the renderer sampling them.
struct Scene {
    store: ImageStore<WgpuBackend>,
    images: [ImageId; TEXTURE_COUNT],
    handles: HandleSet<TEXTURE_COUNT>,
    renderer: TetrahedronRenderer,
}

impl Scene {
    fn new(gpu: &Gpu<'_>) -> Result<Self> {
        let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone());
        let mut store = ImageStore::new(DeviceContext::new(backend));

        let extent = Extent::d2(TEXTURE_SIZE, TEXTURE_SIZE);
        let mut images = [ImageId::default(); TEXTURE_COUNT];
        for (i, slot) in images.iter_mut().enumerate() {
            let id = store
                .create_image_labeled(ImageTarget::Texture2D, PixelFormat::Rgba8, &format!("noise {i}"))
                .with_context(|| format!("failed to create texture {i}"))?;
            let pixels = noise_texture(i, TEXTURE_SIZE, TEXTURE_SIZE);
            store
                .define_level(id, 0, extent, Some(&pixels))
                .with_context(|| format!("failed to upload texture {i}"))?;
            *slot = id;
        }

        let handles = store
            .make_resident_all(images)
            .context("failed to make textures resident")?;
        for (i, handle) in handles.iter().enumerate() {
            log::info!("texture {i}: resident handle {handle}");
        }

        let mut renderer = TetrahedronRenderer::new(gpu.device());
        renderer
            .bind_textures(&store, &handles)
            .context("failed to bind the texture handle array")?;

        Ok(Self {
            store,
            images,
            handles,
            renderer,
        })
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if let Err(e) = self.store.make_non_resident_all(&self.handles) {
            log::warn!("releasing texture handles failed: {e}");
        }
        for id in self.images {
            if let Err(e) = self.store.destroy(id) {
                log::warn!("destroying texture {id:?} failed: {e}");
            }
        }
    }
}
