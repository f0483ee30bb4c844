use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::{Result, TextureError};
use crate::image::{ImageId, ImageTarget, PixelFormat, Region, StorageLayout};

use super::{Capabilities, DeviceResult};

/// Seam between the image store and a concrete device.
///
/// The store validates every argument before calling in: regions are in
/// bounds, data lengths match the region, layouts are valid for the
/// capabilities the backend reported. Implementations only move bytes.
pub trait DeviceBackend {
    /// Backend object for one image.
    type Image;

    /// Reported once, when the owning `DeviceContext` is created.
    fn capabilities(&self) -> Capabilities;

    /// Creates an image name without storage.
    fn create_image(
        &mut self,
        target: ImageTarget,
        format: PixelFormat,
        label: &str,
    ) -> DeviceResult<Self::Image>;

    /// (Re)allocates storage. Previous contents are discarded.
    fn allocate(&mut self, image: &mut Self::Image, layout: &StorageLayout) -> DeviceResult<()>;

    /// Writes tightly packed texel blocks into `region` of `level`.
    fn write(
        &mut self,
        image: &mut Self::Image,
        level: u32,
        region: Region,
        data: &[u8],
    ) -> DeviceResult<()>;

    /// Reads back a whole level, tightly packed.
    fn read(&self, image: &Self::Image, level: u32) -> DeviceResult<Vec<u8>> {
        let _ = (image, level);
        Err(super::DeviceError::Unsupported("image read-back"))
    }

    /// Rebuilds levels `1..layout.levels` from level 0.
    fn generate_mipmaps(&mut self, image: &mut Self::Image, layout: &StorageLayout) -> DeviceResult<()> {
        let _ = (image, layout);
        Err(super::DeviceError::Unsupported("mipmap generation"))
    }

    /// Exposes the levels of `layout` to shaders.
    fn make_resident(&mut self, image: &mut Self::Image, layout: &StorageLayout) -> DeviceResult<()>;

    fn make_non_resident(&mut self, image: &mut Self::Image);

    fn destroy(&mut self, image: Self::Image);
}

/// Explicit device context.
///
/// Holds the backend, the capabilities queried at construction, and the
/// image currently bound to each target. The raw-pointer marker makes the
/// context (and every store that owns it) `!Send + !Sync`: device objects are
/// only touched from the thread that created them.
pub struct DeviceContext<B: DeviceBackend> {
    backend: B,
    caps: Capabilities,
    bindings: HashMap<ImageTarget, ImageId>,
    _device_thread: PhantomData<*const ()>,
}

impl<B: DeviceBackend> DeviceContext<B> {
    pub fn new(backend: B) -> Self {
        let caps = backend.capabilities();
        log::info!(
            "device capabilities: bindless_residency={} max_resident_images={} \
             max_extent_2d={} bc_compression={}",
            caps.bindless_residency,
            caps.max_resident_images,
            caps.max_extent_2d,
            caps.texture_compression_bc,
        );
        if !caps.bindless_residency {
            log::warn!("bindless texture residency is not supported by this device");
        }

        Self {
            backend,
            caps,
            bindings: HashMap::new(),
            _device_thread: PhantomData,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn supports_target(&self, target: ImageTarget) -> bool {
        self.caps.supports_target(target)
    }

    /// Fails with `UnsupportedCapability` when bindless residency is missing.
    pub fn require_bindless(&self) -> Result<()> {
        if self.caps.bindless_residency {
            Ok(())
        } else {
            Err(TextureError::UnsupportedCapability("bindless texture residency"))
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ── binding table ─────────────────────────────────────────────────────

    /// Binds `id` to `target`, returning the previously bound image.
    pub(crate) fn bind(&mut self, target: ImageTarget, id: ImageId) -> Option<ImageId> {
        self.bindings.insert(target, id)
    }

    /// Clears the binding of `target`, returning the image that was bound.
    pub fn unbind(&mut self, target: ImageTarget) -> Option<ImageId> {
        self.bindings.remove(&target)
    }

    pub fn bound(&self, target: ImageTarget) -> Option<ImageId> {
        self.bindings.get(&target).copied()
    }

    /// Drops every binding that refers to `id`.
    pub(crate) fn unbind_image(&mut self, id: ImageId) {
        self.bindings.retain(|_, bound| *bound != id);
    }
}
