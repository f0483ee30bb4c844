use std::num::NonZeroU32;

use crate::device::WgpuBackend;
use crate::error::{Result, TextureError};
use crate::image::{ImageStore, ImageTarget, PixelFormat};
use crate::residency::HandleSet;

/// Binds a `HandleSet` to a shader-side texture array.
///
/// Layout of the bind group:
/// - binding 0: `binding_array<texture_2d<f32>, N>` named after the array
/// - binding 1: a filtering sampler shared by all entries
///
/// Entry `k` of the array is the image behind `set[k]`, so a selector value
/// `k` in the shader samples the k-th image handed to `make_resident_all`.
pub struct HandleArrayBinding {
    name: String,
    count: NonZeroU32,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl HandleArrayBinding {
    pub fn new(device: &wgpu::Device, name: &str, count: NonZeroU32) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(name),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: Some(count),
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(name),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            name: name.to_owned(),
            count,
            layout,
            sampler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Validates `set` and builds the bind group in set order.
    pub fn bind<const N: usize>(
        &self,
        store: &ImageStore<WgpuBackend>,
        set: &HandleSet<N>,
    ) -> Result<wgpu::BindGroup> {
        check_count(self.count.get() as usize, N)?;

        let ids = set.validate(store)?;
        let mut views = Vec::with_capacity(N);
        for id in ids {
            let image = store.image(id)?;
            check_sampled(image.target(), image.format())?;
            let view = image
                .raw()
                .resident_view()
                .ok_or(TextureError::NotResident(id))?;
            views.push(view);
        }

        let device = store.context().backend().device();
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.name),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureViewArray(&views),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }))
    }
}

fn check_count(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(TextureError::HandleCountMismatch { expected, actual });
    }
    Ok(())
}

/// Entries must match the layout: filterable float 2D textures.
fn check_sampled(target: ImageTarget, format: PixelFormat) -> Result<()> {
    if target != ImageTarget::Texture2D {
        return Err(TextureError::UnsupportedTarget(target));
    }
    if !format.is_filterable_float() {
        return Err(TextureError::UnfilterableFormat(format));
    }
    Ok(())
}
