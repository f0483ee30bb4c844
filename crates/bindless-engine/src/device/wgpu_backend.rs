use crate::image::{ImageTarget, PixelFormat, Region, StorageLayout};

use super::{Capabilities, DeviceBackend, DeviceError, DeviceResult};

/// Device backend over a wgpu device and queue.
///
/// Residency maps onto binding arrays: a resident image owns a sampled view
/// that `render::HandleArrayBinding` places into a `binding_array`.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    caps: Capabilities,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let caps = Capabilities::from_device(&device);
        Self { device, queue, caps }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// wgpu texture plus the view that exists while the image is resident.
pub struct WgpuImage {
    label: String,
    format: PixelFormat,
    texture: Option<wgpu::Texture>,
    resident_view: Option<wgpu::TextureView>,
}

impl WgpuImage {
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref()
    }

    /// Sampled view; `None` unless the image is resident.
    pub fn resident_view(&self) -> Option<&wgpu::TextureView> {
        self.resident_view.as_ref()
    }
}

pub(crate) fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
        PixelFormat::R16Float => wgpu::TextureFormat::R16Float,
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::R32Float => wgpu::TextureFormat::R32Float,
        PixelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        PixelFormat::R32Uint => wgpu::TextureFormat::R32Uint,
        PixelFormat::Bc1Rgba => wgpu::TextureFormat::Bc1RgbaUnorm,
        PixelFormat::Bc3Rgba => wgpu::TextureFormat::Bc3RgbaUnorm,
    }
}

impl DeviceBackend for WgpuBackend {
    type Image = WgpuImage;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn create_image(
        &mut self,
        target: ImageTarget,
        format: PixelFormat,
        label: &str,
    ) -> DeviceResult<WgpuImage> {
        // wgpu has no texel buffers; capabilities already report this.
        if target == ImageTarget::Buffer {
            return Err(DeviceError::Unsupported("buffer-backed images"));
        }
        Ok(WgpuImage {
            label: label.to_owned(),
            format,
            texture: None,
            resident_view: None,
        })
    }

    fn allocate(&mut self, image: &mut WgpuImage, layout: &StorageLayout) -> DeviceResult<()> {
        let dimension = match layout.target {
            ImageTarget::Texture1D => wgpu::TextureDimension::D1,
            ImageTarget::Texture2D | ImageTarget::Texture2DMultisample => {
                wgpu::TextureDimension::D2
            }
            ImageTarget::Texture3D => wgpu::TextureDimension::D3,
            ImageTarget::Buffer => return Err(DeviceError::Unsupported("buffer-backed images")),
        };

        // Multisample textures cannot be copy destinations.
        let usage = if layout.target.is_multisample() {
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
        };

        if let Some(old) = image.texture.take() {
            old.destroy();
        }
        image.resident_view = None;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&image.label),
            size: wgpu::Extent3d {
                width: layout.extent.width,
                height: layout.extent.height,
                depth_or_array_layers: layout.extent.depth,
            },
            mip_level_count: layout.levels,
            sample_count: layout.samples,
            dimension,
            format: texture_format(image.format),
            usage,
            view_formats: &[],
        });

        image.texture = Some(texture);
        Ok(())
    }

    fn write(
        &mut self,
        image: &mut WgpuImage,
        level: u32,
        region: Region,
        data: &[u8],
    ) -> DeviceResult<()> {
        let texture = image.texture.as_ref().ok_or(DeviceError::MissingStorage)?;
        let block = image.format.block();
        let columns = block.columns(region.extent.width);
        let rows = block.rows(region.extent.height);

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: level,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: region.z,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(columns * block.bytes),
                rows_per_image: Some(rows),
            },
            // Compressed copies are sized in whole blocks (physical size).
            wgpu::Extent3d {
                width: columns * block.width,
                height: rows * block.height,
                depth_or_array_layers: region.extent.depth,
            },
        );
        Ok(())
    }

    fn make_resident(&mut self, image: &mut WgpuImage, layout: &StorageLayout) -> DeviceResult<()> {
        let texture = image.texture.as_ref().ok_or(DeviceError::MissingStorage)?;
        // Mutable storage carries a full chain; only defined levels are visible.
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&image.label),
            mip_level_count: Some(layout.levels),
            ..Default::default()
        });
        image.resident_view = Some(view);
        Ok(())
    }

    fn make_non_resident(&mut self, image: &mut WgpuImage) {
        image.resident_view = None;
    }

    fn destroy(&mut self, mut image: WgpuImage) {
        image.resident_view = None;
        if let Some(texture) = image.texture.take() {
            texture.destroy();
        }
    }
}
