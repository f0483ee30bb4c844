use crate::image::{ImageTarget, PixelFormat};

/// Device capabilities relevant to images and residency.
///
/// A `DeviceContext` reads these exactly once, at construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Capabilities {
    /// Images can be made resident and sampled through handles without
    /// occupying a binding slot.
    pub bindless_residency: bool,
    /// Upper bound on simultaneously resident images.
    pub max_resident_images: u32,
    pub max_extent_1d: u32,
    pub max_extent_2d: u32,
    pub max_extent_3d: u32,
    /// Supported multisample counts as a bit set of the counts themselves
    /// (`2 | 4` allows 2x and 4x).
    pub sample_counts: u32,
    /// 1D images may carry more than one mip level.
    pub mipmapped_1d: bool,
    /// Block-compressed images need a base extent that is a whole number of
    /// blocks.
    pub block_aligned_base: bool,
    pub multisample_images: bool,
    pub buffer_images: bool,
    pub texture_compression_bc: bool,
}

impl Default for Capabilities {
    /// Everything supported, with limits typical of desktop hardware.
    fn default() -> Self {
        Self {
            bindless_residency: true,
            max_resident_images: 1024,
            max_extent_1d: 16384,
            max_extent_2d: 16384,
            max_extent_3d: 2048,
            sample_counts: 2 | 4 | 8,
            mipmapped_1d: true,
            block_aligned_base: false,
            multisample_images: true,
            buffer_images: true,
            texture_compression_bc: true,
        }
    }
}

impl Capabilities {
    /// wgpu features backing bindless residency: texture binding arrays
    /// indexed by a per-fragment (non-uniform) selector.
    pub fn bindless_features() -> wgpu::Features {
        wgpu::Features::TEXTURE_BINDING_ARRAY
            | wgpu::Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
    }

    /// Derives capabilities from an adapter's or device's feature set and limits.
    pub fn from_wgpu(features: wgpu::Features, limits: &wgpu::Limits) -> Self {
        let bindless_residency = features.contains(Self::bindless_features());
        Self {
            bindless_residency,
            max_resident_images: if bindless_residency {
                limits.max_binding_array_elements_per_shader_stage
            } else {
                0
            },
            max_extent_1d: limits.max_texture_dimension_1d,
            max_extent_2d: limits.max_texture_dimension_2d,
            max_extent_3d: limits.max_texture_dimension_3d,
            // 4x is the only multisample count wgpu guarantees for all formats.
            sample_counts: 4,
            mipmapped_1d: false,
            block_aligned_base: true,
            multisample_images: true,
            buffer_images: false,
            texture_compression_bc: features.contains(wgpu::Features::TEXTURE_COMPRESSION_BC),
        }
    }

    /// Capabilities of an already created wgpu device.
    pub fn from_device(device: &wgpu::Device) -> Self {
        Self::from_wgpu(device.features(), &device.limits())
    }

    pub fn supports_target(&self, target: ImageTarget) -> bool {
        match target {
            ImageTarget::Texture2DMultisample => self.multisample_images,
            ImageTarget::Buffer => self.buffer_images,
            ImageTarget::Texture1D | ImageTarget::Texture2D | ImageTarget::Texture3D => true,
        }
    }

    pub fn supports_format(&self, format: PixelFormat) -> bool {
        !format.is_compressed() || self.texture_compression_bc
    }

    /// Whether multisample images may use `samples` samples per texel.
    pub fn supports_samples(&self, samples: u32) -> bool {
        samples >= 2 && samples.is_power_of_two() && self.sample_counts & samples != 0
    }

    /// Largest axis allowed for images of `target`.
    pub fn max_extent(&self, target: ImageTarget) -> u32 {
        match target {
            ImageTarget::Texture1D | ImageTarget::Buffer => self.max_extent_1d,
            ImageTarget::Texture2D | ImageTarget::Texture2DMultisample => self.max_extent_2d,
            ImageTarget::Texture3D => self.max_extent_3d,
        }
    }
}
