use slotmap::{SlotMap, new_key_type};

use crate::device::{DeviceBackend, DeviceContext};
use crate::error::{Result, TextureError};
use crate::residency::{ResidencyRegistry, ResidentHandle};

use super::{Extent, ImageTarget, PixelFormat, Region, StorageLayout};

new_key_type! {
    /// Versioned key of an image in an `ImageStore`.
    ///
    /// A key outlives its image; lookups through it then fail instead of
    /// reaching whatever image reuses the slot.
    pub struct ImageId;
}

/// Residency state of one image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Residency {
    #[default]
    NonResident,
    Resident(ResidentHandle),
}

/// A device image owned by the store.
pub struct Image<R> {
    pub(crate) target: ImageTarget,
    pub(crate) format: PixelFormat,
    pub(crate) label: String,
    pub(crate) layout: Option<StorageLayout>,
    pub(crate) residency: Residency,
    pub(crate) raw: R,
}

impl<R> Image<R> {
    pub fn target(&self) -> ImageTarget {
        self.target
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Storage layout; `None` until the first `allocate`/`define_level`.
    pub fn layout(&self) -> Option<&StorageLayout> {
        self.layout.as_ref()
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.residency, Residency::Resident(_))
    }

    /// Backend object.
    pub fn raw(&self) -> &R {
        &self.raw
    }

    fn level_extent(&self, id: ImageId, level: u32) -> Result<Extent> {
        let layout = self.layout.as_ref().ok_or(TextureError::Unallocated(id))?;
        layout.level_extent(level).ok_or(TextureError::LevelOutOfRange {
            level,
            levels: layout.levels,
        })
    }
}

/// Sole owner of device images.
///
/// Every call validates its arguments completely before touching the
/// backend, so a failed call leaves contents and state as they were.
pub struct ImageStore<B: DeviceBackend> {
    pub(crate) context: DeviceContext<B>,
    pub(crate) images: SlotMap<ImageId, Image<B::Image>>,
    pub(crate) registry: ResidencyRegistry,
}

// new & queries
impl<B: DeviceBackend> ImageStore<B> {
    pub fn new(context: DeviceContext<B>) -> Self {
        Self {
            context,
            images: SlotMap::with_key(),
            registry: ResidencyRegistry::default(),
        }
    }

    pub fn context(&self) -> &DeviceContext<B> {
        &self.context
    }

    pub fn image(&self, id: ImageId) -> Result<&Image<B::Image>> {
        self.images.get(id).ok_or(TextureError::DestroyedImage(id))
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.images.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &Image<B::Image>)> {
        self.images.iter()
    }

    pub fn registry(&self) -> &ResidencyRegistry {
        &self.registry
    }
}

// create & storage
impl<B: DeviceBackend> ImageStore<B> {
    /// Creates an image without storage.
    pub fn create_image(&mut self, target: ImageTarget, format: PixelFormat) -> Result<ImageId> {
        self.create_image_labeled(target, format, "image")
    }

    pub fn create_image_labeled(
        &mut self,
        target: ImageTarget,
        format: PixelFormat,
        label: &str,
    ) -> Result<ImageId> {
        self.context.require_bindless()?;
        if !self.context.supports_target(target) {
            return Err(TextureError::UnsupportedTarget(target));
        }
        if !self.context.capabilities().supports_format(format) {
            return Err(TextureError::UnsupportedFormat(format));
        }
        if format.is_compressed() && target != ImageTarget::Texture2D {
            return Err(TextureError::UnsupportedOperation {
                target,
                operation: "block compression",
            });
        }

        let raw = self.context.backend_mut().create_image(target, format, label)?;
        let id = self.images.insert(Image {
            target,
            format,
            label: label.to_owned(),
            layout: None,
            residency: Residency::NonResident,
            raw,
        });
        log::debug!("created {target} image {id:?} ({format:?}) \"{label}\"");
        Ok(id)
    }

    /// Commits immutable storage: `levels` mip levels starting at `extent`.
    pub fn allocate(&mut self, id: ImageId, levels: u32, extent: Extent) -> Result<()> {
        let target = self.image(id)?.target;
        if target.is_multisample() {
            return Err(TextureError::UnsupportedOperation {
                target,
                operation: "single-sampled allocation",
            });
        }
        self.commit_layout(id, StorageLayout {
            target,
            extent,
            levels,
            samples: 1,
            immutable: true,
        })
    }

    /// Commits immutable multisample storage.
    pub fn allocate_multisample(&mut self, id: ImageId, samples: u32, extent: Extent) -> Result<()> {
        let target = self.image(id)?.target;
        if !target.is_multisample() {
            return Err(TextureError::UnsupportedOperation {
                target,
                operation: "multisample allocation",
            });
        }
        self.commit_layout(id, StorageLayout {
            target,
            extent,
            levels: 1,
            samples,
            immutable: true,
        })
    }

    /// Defines one level of mutable storage, optionally with contents.
    ///
    /// Level 0 sets the base extent; a new base extent discards every level.
    /// Level `n` must have the mip extent of the base and directly follow the
    /// levels defined so far. Rejected once the image is resident.
    pub fn define_level(
        &mut self,
        id: ImageId,
        level: u32,
        extent: Extent,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let image = self.image(id)?;
        let (target, format, layout) = (image.target, image.format, image.layout);
        if !target.accepts_uploads() {
            return Err(TextureError::UnsupportedOperation {
                target,
                operation: "mutable definition",
            });
        }
        if image.is_resident() {
            return Err(TextureError::StorageLocked(id));
        }
        if layout.is_some_and(|l| l.immutable) {
            return Err(TextureError::ImmutableStorage(id));
        }
        if let Some(data) = data {
            check_len(Region::full(extent), format, data)?;
        }

        if level == 0 {
            if layout.is_none_or(|l| l.extent != extent) {
                self.commit_layout(id, StorageLayout {
                    target,
                    extent,
                    levels: 1,
                    samples: 1,
                    immutable: false,
                })?;
            }
        } else {
            let mut layout = layout.ok_or(TextureError::Unallocated(id))?;
            let limit = StorageLayout::level_limit(target, layout.extent, self.context.capabilities());
            if level >= limit {
                return Err(TextureError::LevelOutOfRange { level, levels: limit });
            }
            if level > layout.levels {
                return Err(TextureError::InvalidLayout(format!(
                    "level {level} defined before level {}",
                    layout.levels
                )));
            }
            layout.levels = layout.levels.max(level + 1);
            let expected = layout.level_extent(level).unwrap_or(extent);
            if extent != expected {
                return Err(TextureError::InvalidLayout(format!(
                    "level {level} of a {} base must be {expected}, got {extent}",
                    layout.extent
                )));
            }
            if let Some(image) = self.images.get_mut(id) {
                image.layout = Some(layout);
            }
            log::trace!("image {id:?}: defined level {level} {extent}");
        }

        if let Some(data) = data {
            self.upload_unchecked(id, level, Region::full(extent), data)?;
        }
        Ok(())
    }

    fn commit_layout(&mut self, id: ImageId, layout: StorageLayout) -> Result<()> {
        let image = self.images.get_mut(id).ok_or(TextureError::DestroyedImage(id))?;
        if image.is_resident() {
            return Err(TextureError::StorageLocked(id));
        }
        if image.layout.is_some_and(|l| l.immutable) {
            return Err(TextureError::ImmutableStorage(id));
        }
        let caps = self.context.capabilities();
        layout.validate(image.format, caps)?;

        // Mutable storage backs the whole chain so later levels need no
        // reallocation.
        let physical = if layout.immutable {
            layout
        } else {
            StorageLayout {
                levels: StorageLayout::level_limit(layout.target, layout.extent, caps),
                ..layout
            }
        };
        self.context.backend_mut().allocate(&mut image.raw, &physical)?;
        image.layout = Some(layout);
        log::debug!(
            "image {id:?}: {} storage {} x{} levels",
            if layout.immutable { "immutable" } else { "mutable" },
            layout.extent,
            layout.levels,
        );
        Ok(())
    }
}

// uploads
impl<B: DeviceBackend> ImageStore<B> {
    /// Writes uncompressed texels into `region` of `level`.
    ///
    /// `data` must hold exactly `region texels × bytes per texel` bytes and
    /// the region must lie inside the level. Resident handles stay valid.
    pub fn upload(&mut self, id: ImageId, level: u32, region: Region, data: &[u8]) -> Result<()> {
        let image = self.image(id)?;
        if image.format.is_compressed() {
            return Err(TextureError::FormatMismatch {
                format: image.format,
                compressed: false,
            });
        }
        self.check_upload(id, level, region)?;
        check_len(region, image.format, data)?;
        self.upload_unchecked(id, level, region, data)
    }

    /// Writes block-compressed data into a block-aligned `region` of `level`.
    pub fn upload_compressed(
        &mut self,
        id: ImageId,
        level: u32,
        region: Region,
        blob: &[u8],
    ) -> Result<()> {
        let image = self.image(id)?;
        let format = image.format;
        if !format.is_compressed() {
            return Err(TextureError::FormatMismatch {
                format,
                compressed: true,
            });
        }
        let extent = self.check_upload(id, level, region)?;
        if !region.is_block_aligned(format.block(), extent) {
            return Err(TextureError::UnalignedRegion {
                region,
                block: format.block(),
            });
        }
        check_len(region, format, blob)?;
        self.upload_unchecked(id, level, region, blob)
    }

    /// Fills a whole level with one texel value.
    pub fn clear(&mut self, id: ImageId, level: u32, texel: &[u8]) -> Result<()> {
        let extent = self.image(id)?.level_extent(id, level)?;
        self.clear_region(id, level, Region::full(extent), texel)
    }

    /// Fills `region` of `level` with one texel value.
    pub fn clear_region(&mut self, id: ImageId, level: u32, region: Region, texel: &[u8]) -> Result<()> {
        let format = self.image(id)?.format;
        let bytes_per_texel = format.bytes_per_texel().ok_or(TextureError::FormatMismatch {
            format,
            compressed: false,
        })?;
        if texel.len() != bytes_per_texel as usize {
            return Err(TextureError::SizeMismatch {
                expected: bytes_per_texel as usize,
                actual: texel.len(),
            });
        }
        self.check_upload(id, level, region)?;

        let data = texel.repeat(region.texel_count() as usize);
        self.upload_unchecked(id, level, region, &data)
    }

    /// Rebuilds levels `1..` from level 0 with a box filter.
    ///
    /// Mutable storage first grows to its full mip chain, which needs the
    /// image to be non-resident. Immutable storage keeps its level count.
    pub fn generate_mipmaps(&mut self, id: ImageId) -> Result<()> {
        let image = self.image(id)?;
        let (target, format) = (image.target, image.format);
        let mut layout = *image.layout().ok_or(TextureError::Unallocated(id))?;
        if !target.has_mipmaps() {
            return Err(TextureError::UnsupportedOperation {
                target,
                operation: "mipmap generation",
            });
        }
        if format.is_compressed() {
            return Err(TextureError::FormatMismatch {
                format,
                compressed: false,
            });
        }
        if !layout.immutable {
            let chain = StorageLayout::level_limit(target, layout.extent, self.context.capabilities());
            if chain != layout.levels && image.is_resident() {
                return Err(TextureError::StorageLocked(id));
            }
            layout.levels = chain;
        }

        let image = self.images.get_mut(id).ok_or(TextureError::DestroyedImage(id))?;
        self.context.backend_mut().generate_mipmaps(&mut image.raw, &layout)?;
        image.layout = Some(layout);
        log::trace!("image {id:?}: generated {} mip levels", layout.levels);
        Ok(())
    }

    /// Reads back a whole level where the backend supports it.
    pub fn read(&self, id: ImageId, level: u32) -> Result<Vec<u8>> {
        let image = self.image(id)?;
        image.level_extent(id, level)?;
        Ok(self.context.backend().read(&image.raw, level)?)
    }

    /// Checks target, storage, level and bounds; returns the level extent.
    fn check_upload(&self, id: ImageId, level: u32, region: Region) -> Result<Extent> {
        let image = self.image(id)?;
        if !image.target.accepts_uploads() {
            return Err(TextureError::UnsupportedOperation {
                target: image.target,
                operation: "texel upload",
            });
        }
        let extent = image.level_extent(id, level)?;
        if !region.fits_within(extent) {
            return Err(TextureError::RegionOutOfBounds {
                level,
                region,
                extent,
            });
        }
        Ok(extent)
    }

    fn upload_unchecked(&mut self, id: ImageId, level: u32, region: Region, data: &[u8]) -> Result<()> {
        let image = self.images.get_mut(id).ok_or(TextureError::DestroyedImage(id))?;
        self.context
            .backend_mut()
            .write(&mut image.raw, level, region, data)?;
        log::trace!("image {id:?}: wrote {} bytes to level {level} {region}", data.len());
        Ok(())
    }
}

// binding & destruction
impl<B: DeviceBackend> ImageStore<B> {
    /// Binds `id` to its target on the device context.
    pub fn bind(&mut self, id: ImageId) -> Result<Option<ImageId>> {
        let target = self.image(id)?.target;
        Ok(self.context.bind(target, id))
    }

    pub fn unbind(&mut self, target: ImageTarget) -> Option<ImageId> {
        self.context.unbind(target)
    }

    pub fn bound(&self, target: ImageTarget) -> Option<ImageId> {
        self.context.bound(target)
    }

    /// Releases the image and its device memory.
    ///
    /// A handle still outstanding for the image becomes permanently invalid;
    /// presenting it later fails with `UseAfterDestroy`. Callers are expected
    /// to call `make_non_resident` first.
    pub fn destroy(&mut self, id: ImageId) -> Result<()> {
        let mut image = self.images.remove(id).ok_or(TextureError::DestroyedImage(id))?;
        self.context.unbind_image(id);

        if let Residency::Resident(handle) = image.residency {
            log::warn!("destroying image {id:?} while resident; handle {handle} is now invalid");
            self.context.backend_mut().make_non_resident(&mut image.raw);
        }
        self.registry.retire_destroyed(id, image.residency);

        self.context.backend_mut().destroy(image.raw);
        log::debug!("destroyed image {id:?} \"{}\"", image.label);
        Ok(())
    }
}

impl<B: DeviceBackend> Drop for ImageStore<B> {
    fn drop(&mut self) {
        if !self.images.is_empty() {
            log::debug!("dropping ImageStore with {} live images", self.images.len());
        }
        for (_, image) in self.images.drain() {
            self.context.backend_mut().destroy(image.raw);
        }
    }
}

fn check_len(region: Region, format: PixelFormat, data: &[u8]) -> Result<()> {
    let expected = region.byte_len(format.block()).unwrap_or(usize::MAX);
    if data.len() != expected {
        return Err(TextureError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
