use crate::image::{Extent, ImageTarget, PixelFormat, Region, StorageLayout, TexelBlock};

use super::{Capabilities, DeviceBackend, DeviceError, DeviceResult};

/// Device backend that keeps images in host memory.
///
/// Used for headless runs and tests. Capabilities are configurable so that
/// missing-feature paths can be exercised without real hardware.
#[derive(Debug)]
pub struct HostBackend {
    caps: Capabilities,
    next_name: u32,
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self { caps, next_name: 1 }
    }

    /// A device that can store images but not make them resident.
    pub fn without_bindless() -> Self {
        Self::with_capabilities(Capabilities {
            bindless_residency: false,
            max_resident_images: 0,
            ..Capabilities::default()
        })
    }
}

/// Host-memory image: one tightly packed byte vector per mip level.
#[derive(Debug)]
pub struct HostImage {
    name: u32,
    label: String,
    target: ImageTarget,
    format: PixelFormat,
    levels: Vec<HostLevel>,
    resident: bool,
}

#[derive(Debug)]
struct HostLevel {
    extent: Extent,
    bytes: Vec<u8>,
}

impl HostImage {
    /// Backend-assigned name, unique per backend.
    pub fn name(&self) -> u32 {
        self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn target(&self) -> ImageTarget {
        self.target
    }

    pub fn is_resident(&self) -> bool {
        self.resident
    }

    /// Raw contents of `level`, if allocated.
    pub fn level_bytes(&self, level: u32) -> Option<&[u8]> {
        self.levels.get(level as usize).map(|l| l.bytes.as_slice())
    }
}

impl DeviceBackend for HostBackend {
    type Image = HostImage;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn create_image(
        &mut self,
        target: ImageTarget,
        format: PixelFormat,
        label: &str,
    ) -> DeviceResult<HostImage> {
        let name = self.next_name;
        self.next_name = self.next_name.wrapping_add(1).max(1);
        Ok(HostImage {
            name,
            label: label.to_owned(),
            target,
            format,
            levels: Vec::new(),
            resident: false,
        })
    }

    fn allocate(&mut self, image: &mut HostImage, layout: &StorageLayout) -> DeviceResult<()> {
        let block = image.format.block();
        let mut levels = Vec::with_capacity(layout.levels as usize);
        for level in 0..layout.levels {
            let extent = layout.level_extent(level).ok_or(DeviceError::MissingStorage)?;
            let len = Region::full(extent)
                .byte_len(block)
                .and_then(|n| n.checked_mul(layout.samples as usize))
                .ok_or(DeviceError::OutOfMemory)?;
            levels.push(HostLevel {
                extent,
                bytes: vec![0; len],
            });
        }
        image.levels = levels;
        Ok(())
    }

    fn write(
        &mut self,
        image: &mut HostImage,
        level: u32,
        region: Region,
        data: &[u8],
    ) -> DeviceResult<()> {
        let block = image.format.block();
        let dst = image
            .levels
            .get_mut(level as usize)
            .ok_or(DeviceError::MissingStorage)?;
        copy_blocks(&mut dst.bytes, dst.extent, region, block, data);
        Ok(())
    }

    fn read(&self, image: &HostImage, level: u32) -> DeviceResult<Vec<u8>> {
        image
            .level_bytes(level)
            .map(<[u8]>::to_vec)
            .ok_or(DeviceError::MissingStorage)
    }

    fn generate_mipmaps(&mut self, image: &mut HostImage, layout: &StorageLayout) -> DeviceResult<()> {
        let channel = Channel::of(image.format).ok_or(DeviceError::Unsupported(
            "host mipmap generation for this format",
        ))?;
        let texel_bytes = image.format.block().bytes as usize;
        let levels = layout.levels as usize;
        if image.levels.len() < levels {
            return Err(DeviceError::MissingStorage);
        }

        for level in 1..levels {
            let (built, rest) = image.levels.split_at_mut(level);
            let (src, dst) = (&built[level - 1], &mut rest[0]);
            dst.bytes = downsample(&src.bytes, src.extent, dst.extent, channel, texel_bytes);
        }
        Ok(())
    }

    fn make_resident(&mut self, image: &mut HostImage, _layout: &StorageLayout) -> DeviceResult<()> {
        if image.levels.is_empty() {
            return Err(DeviceError::MissingStorage);
        }
        image.resident = true;
        Ok(())
    }

    fn make_non_resident(&mut self, image: &mut HostImage) {
        image.resident = false;
    }

    fn destroy(&mut self, image: HostImage) {
        log::trace!("host image {} ({}) released", image.name, image.label);
    }
}

/// Copies a packed block region into a packed level, row by row.
fn copy_blocks(dst: &mut [u8], level: Extent, region: Region, block: TexelBlock, src: &[u8]) {
    let level_cols = block.columns(level.width) as usize;
    let level_rows = block.rows(level.height) as usize;

    let x0 = (region.x / block.width) as usize;
    let y0 = (region.y / block.height) as usize;
    let z0 = region.z as usize;
    let cols = block.columns(region.extent.width) as usize;
    let rows = block.rows(region.extent.height) as usize;
    let row_bytes = cols * block.bytes as usize;

    for z in 0..region.extent.depth as usize {
        for row in 0..rows {
            let dst_block = ((z0 + z) * level_rows + y0 + row) * level_cols + x0;
            let dst_at = dst_block * block.bytes as usize;
            let src_at = (z * rows + row) * row_bytes;
            dst[dst_at..dst_at + row_bytes].copy_from_slice(&src[src_at..src_at + row_bytes]);
        }
    }
}

/// Channel encodings the host box filter can average.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Channel {
    Unorm8,
    Float32,
}

impl Channel {
    fn of(format: PixelFormat) -> Option<Self> {
        match format {
            PixelFormat::R8
            | PixelFormat::Rg8
            | PixelFormat::Rgba8
            | PixelFormat::Rgba8Srgb
            | PixelFormat::Bgra8 => Some(Channel::Unorm8),
            PixelFormat::R32Float | PixelFormat::Rgba32Float => Some(Channel::Float32),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            Channel::Unorm8 => 1,
            Channel::Float32 => 4,
        }
    }

    fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            Channel::Unorm8 => f32::from(bytes[0]),
            Channel::Float32 => bytemuck::pod_read_unaligned::<f32>(bytes),
        }
    }

    fn encode(self, value: f32, out: &mut Vec<u8>) {
        match self {
            Channel::Unorm8 => out.push(value.round().clamp(0.0, 255.0) as u8),
            Channel::Float32 => out.extend_from_slice(bytemuck::bytes_of(&value)),
        }
    }
}

/// Box-filters `src` down to `dst` texels: each destination texel averages
/// the 2x2x2 source texels under it, clipped to the source extent.
fn downsample(src: &[u8], from: Extent, to: Extent, channel: Channel, texel_bytes: usize) -> Vec<u8> {
    let footprint = |i: u32, len: u32| 2 * i..(2 * i + 2).min(len);
    let channels = texel_bytes / channel.size();
    let mut out = Vec::with_capacity(to.texel_count() as usize * texel_bytes);

    for z in 0..to.depth {
        for y in 0..to.height {
            for x in 0..to.width {
                for c in 0..channels {
                    let (mut sum, mut n) = (0.0f32, 0u32);
                    for sz in footprint(z, from.depth) {
                        for sy in footprint(y, from.height) {
                            for sx in footprint(x, from.width) {
                                let texel = ((sz * from.height + sy) * from.width + sx) as usize;
                                let at = texel * texel_bytes + c * channel.size();
                                sum += channel.decode(&src[at..at + channel.size()]);
                                n += 1;
                            }
                        }
                    }
                    channel.encode(sum / n as f32, &mut out);
                }
            }
        }
    }
    out
}
