use crate::device::Capabilities;
use crate::error::{Result, TextureError};

use super::{Extent, ImageTarget, PixelFormat};

/// Storage committed for an image: shape, mip chain and sample count.
///
/// Immutable layouts come from `ImageStore::allocate` and can never be
/// replaced. Mutable layouts come from `ImageStore::define_level`, grow one
/// level at a time and may be redefined until the image becomes resident.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StorageLayout {
    pub target: ImageTarget,
    /// Extent of level 0.
    pub extent: Extent,
    pub levels: u32,
    pub samples: u32,
    pub immutable: bool,
}

impl StorageLayout {
    /// Full mip chain length for `extent` on `target`.
    pub fn max_levels(target: ImageTarget, extent: Extent) -> u32 {
        if !target.has_mipmaps() {
            return 1;
        }
        let axis = match target.dimensions() {
            1 => extent.width,
            2 => extent.width.max(extent.height),
            _ => extent.max_axis(),
        };
        u32::BITS - axis.max(1).leading_zeros()
    }

    /// Longest mip chain the device allows for `extent` on `target`.
    pub fn level_limit(target: ImageTarget, extent: Extent, caps: &Capabilities) -> u32 {
        if target == ImageTarget::Texture1D && !caps.mipmapped_1d {
            return 1;
        }
        Self::max_levels(target, extent)
    }

    /// Extent of `level`, or `None` past the end of the chain.
    pub fn level_extent(&self, level: u32) -> Option<Extent> {
        if level >= self.levels {
            return None;
        }
        let shrink = |v: u32| (v >> level).max(1);
        let e = self.extent;
        Some(match self.target.dimensions() {
            1 => Extent::d1(shrink(e.width)),
            2 => Extent::d2(shrink(e.width), shrink(e.height)),
            _ => Extent::d3(shrink(e.width), shrink(e.height), shrink(e.depth)),
        })
    }

    /// Validates a requested layout for `format` against the target shape
    /// and the device.
    pub(crate) fn validate(&self, format: PixelFormat, caps: &Capabilities) -> Result<()> {
        let StorageLayout { target, extent, levels, samples, .. } = *self;
        let invalid = |msg: String| Err(TextureError::InvalidLayout(msg));

        if extent.is_empty() {
            return invalid(format!("{target} image with empty extent {extent}"));
        }

        let unused_axes_ok = match target.dimensions() {
            1 => extent.height == 1 && extent.depth == 1,
            2 => extent.depth == 1,
            _ => true,
        };
        if !unused_axes_ok {
            return invalid(format!("extent {extent} has too many axes for a {target} image"));
        }

        let max = caps.max_extent(target);
        if extent.max_axis() > max {
            return invalid(format!("extent {extent} exceeds device limit {max}"));
        }

        let block = format.block();
        if caps.block_aligned_base
            && (extent.width % block.width != 0 || extent.height % block.height != 0)
        {
            return invalid(format!(
                "{format:?} base extent {extent} is not a whole number of {block} blocks"
            ));
        }

        let max_levels = Self::level_limit(target, extent, caps);
        if levels == 0 || levels > max_levels {
            return invalid(format!(
                "{levels} mip levels requested, {target} {extent} allows 1..={max_levels}"
            ));
        }

        if target.is_multisample() {
            if !caps.supports_samples(samples) {
                return invalid(format!(
                    "{samples} samples requested, device sample counts {:#b}",
                    caps.sample_counts
                ));
            }
        } else if samples != 1 {
            return invalid(format!("{target} images are single-sampled"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(target: ImageTarget, extent: Extent, levels: u32) -> StorageLayout {
        StorageLayout {
            target,
            extent,
            levels,
            samples: if target.is_multisample() { 4 } else { 1 },
            immutable: true,
        }
    }

    #[test]
    fn full_chain_of_512_square_has_ten_levels() {
        assert_eq!(
            StorageLayout::max_levels(ImageTarget::Texture2D, Extent::d2(512, 512)),
            10
        );
    }

    #[test]
    fn non_square_chain_follows_largest_axis() {
        assert_eq!(
            StorageLayout::max_levels(ImageTarget::Texture2D, Extent::d2(8, 2)),
            4
        );
        assert_eq!(
            StorageLayout::max_levels(ImageTarget::Texture2DMultisample, Extent::d2(8, 8)),
            1
        );
    }

    #[test]
    fn level_extents_clamp_to_one() {
        let l = layout(ImageTarget::Texture2D, Extent::d2(8, 2), 4);
        assert_eq!(l.level_extent(0), Some(Extent::d2(8, 2)));
        assert_eq!(l.level_extent(2), Some(Extent::d2(2, 1)));
        assert_eq!(l.level_extent(3), Some(Extent::d2(1, 1)));
        assert_eq!(l.level_extent(4), None);
    }

    #[test]
    fn three_d_levels_shrink_depth() {
        let l = layout(ImageTarget::Texture3D, Extent::d3(4, 4, 4), 2);
        assert_eq!(l.level_extent(1), Some(Extent::d3(2, 2, 2)));
    }

    #[test]
    fn rejects_depth_on_2d_target() {
        let l = layout(ImageTarget::Texture2D, Extent::d3(4, 4, 2), 1);
        assert!(matches!(
            l.validate(PixelFormat::Rgba8, &Capabilities::default()),
            Err(TextureError::InvalidLayout(_))
        ));
    }

    #[test]
    fn rejects_too_many_levels() {
        let l = layout(ImageTarget::Texture2D, Extent::d2(4, 4), 4);
        assert!(l.validate(PixelFormat::Rgba8, &Capabilities::default()).is_err());
        let l = layout(ImageTarget::Texture2D, Extent::d2(4, 4), 3);
        assert!(l.validate(PixelFormat::Rgba8, &Capabilities::default()).is_ok());
    }

    #[test]
    fn multisample_needs_power_of_two_samples() {
        let mut l = layout(ImageTarget::Texture2DMultisample, Extent::d2(64, 64), 1);
        assert!(l.validate(PixelFormat::Rgba8, &Capabilities::default()).is_ok());
        l.samples = 3;
        assert!(l.validate(PixelFormat::Rgba8, &Capabilities::default()).is_err());
    }

    fn wgpu_like() -> Capabilities {
        Capabilities {
            sample_counts: 4,
            mipmapped_1d: false,
            block_aligned_base: true,
            ..Capabilities::default()
        }
    }

    #[test]
    fn sample_counts_follow_the_device() {
        let mut l = layout(ImageTarget::Texture2DMultisample, Extent::d2(64, 64), 1);
        l.samples = 2;
        assert!(l.validate(PixelFormat::Rgba8, &Capabilities::default()).is_ok());
        assert!(l.validate(PixelFormat::Rgba8, &wgpu_like()).is_err());
        l.samples = 4;
        assert!(l.validate(PixelFormat::Rgba8, &wgpu_like()).is_ok());
    }

    #[test]
    fn one_d_mip_chains_need_device_support() {
        let l = layout(ImageTarget::Texture1D, Extent::d1(8), 4);
        assert!(l.validate(PixelFormat::R8, &Capabilities::default()).is_ok());
        assert!(matches!(
            l.validate(PixelFormat::R8, &wgpu_like()),
            Err(TextureError::InvalidLayout(_))
        ));
        assert_eq!(
            StorageLayout::level_limit(ImageTarget::Texture1D, Extent::d1(8), &wgpu_like()),
            1
        );
    }

    #[test]
    fn compressed_base_must_be_whole_blocks_when_required() {
        let l = layout(ImageTarget::Texture2D, Extent::d2(10, 10), 1);
        assert!(l.validate(PixelFormat::Bc1Rgba, &Capabilities::default()).is_ok());
        assert!(l.validate(PixelFormat::Bc1Rgba, &wgpu_like()).is_err());
        // Uncompressed formats use 1x1 blocks.
        assert!(l.validate(PixelFormat::Rgba8, &wgpu_like()).is_ok());

        let aligned = layout(ImageTarget::Texture2D, Extent::d2(12, 8), 2);
        assert!(aligned.validate(PixelFormat::Bc1Rgba, &wgpu_like()).is_ok());
    }

    #[test]
    fn rejects_extent_above_device_limit() {
        let caps = Capabilities {
            max_extent_2d: 256,
            ..Capabilities::default()
        };
        let l = layout(ImageTarget::Texture2D, Extent::d2(512, 512), 1);
        assert!(l.validate(PixelFormat::Rgba8, &caps).is_err());
    }
}
