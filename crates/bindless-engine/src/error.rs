//! Error taxonomy of the texture core.
//!
//! Every failure is local and synchronous: it is returned from the offending
//! call and never retried. Application layers wrap these in `anyhow`.

use thiserror::Error;

use crate::device::DeviceError;
use crate::image::{Extent, ImageId, ImageTarget, PixelFormat, Region, TexelBlock};
use crate::residency::ResidentHandle;

/// Result alias used across the texture core.
pub type Result<T> = std::result::Result<T, TextureError>;

#[derive(Debug, Error)]
pub enum TextureError {
    // ── capability ────────────────────────────────────────────────────────
    /// The running device lacks a capability the operation depends on.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),

    #[error("image target {0} is not supported by this device")]
    UnsupportedTarget(ImageTarget),

    #[error("pixel format {0:?} is not supported by this device")]
    UnsupportedFormat(PixelFormat),

    #[error("{operation} is not available for {target} images")]
    UnsupportedOperation {
        target: ImageTarget,
        operation: &'static str,
    },

    // ── upload / layout ───────────────────────────────────────────────────
    #[error("region {region} exceeds level {level} extent {extent}")]
    RegionOutOfBounds {
        level: u32,
        region: Region,
        extent: Extent,
    },

    #[error("mip level {level} out of range (image has {levels} levels)")]
    LevelOutOfRange { level: u32, levels: u32 },

    #[error("pixel data is {actual} bytes, region requires {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("region {region} is not aligned to {block} texel blocks")]
    UnalignedRegion { region: Region, block: TexelBlock },

    /// Plain uploads into a block-compressed image, or compressed uploads
    /// into an uncompressed one.
    #[error("format {format:?} does not accept {kind} data", kind = data_kind(.compressed))]
    FormatMismatch { format: PixelFormat, compressed: bool },

    #[error("invalid storage layout: {0}")]
    InvalidLayout(String),

    #[error("image {0:?} has no storage yet")]
    Unallocated(ImageId),

    #[error("image {0:?} uses immutable storage")]
    ImmutableStorage(ImageId),

    /// Storage layout changes are forbidden while the image is resident.
    #[error("image {0:?} is resident; its storage layout is locked")]
    StorageLocked(ImageId),

    // ── residency ─────────────────────────────────────────────────────────
    #[error("image {0:?} is already resident")]
    AlreadyResident(ImageId),

    #[error("image {0:?} is not resident")]
    NotResident(ImageId),

    #[error("resident image limit of {limit} reached")]
    ResidencyLimit { limit: u32 },

    /// The handle's image was destroyed while the handle was outstanding.
    #[error("handle {0} refers to a destroyed image")]
    UseAfterDestroy(ResidentHandle),

    /// The handle was released by `make_non_resident`.
    #[error("handle {0} has been released")]
    StaleHandle(ResidentHandle),

    #[error("handle {0} was never issued by this store")]
    UnknownHandle(ResidentHandle),

    /// A handle set names the same image twice where each entry must be distinct.
    #[error("handle {0} appears more than once in the set")]
    DuplicateHandle(ResidentHandle),

    #[error("handle array holds {expected} images, set has {actual}")]
    HandleCountMismatch { expected: usize, actual: usize },

    /// Handle arrays are sampled through a filtering sampler.
    #[error("pixel format {0:?} cannot be sampled with filtering")]
    UnfilterableFormat(PixelFormat),

    #[error("image {0:?} does not exist or was destroyed")]
    DestroyedImage(ImageId),

    // ── backend ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Device(#[from] DeviceError),
}

fn data_kind(compressed: &bool) -> &'static str {
    if *compressed { "compressed" } else { "uncompressed" }
}
