//! Image store.
//!
//! Images are device-side pixel grids of a fixed shape (`ImageTarget`) and
//! format. The store is their sole owner: it allocates storage, validates
//! every upload against the storage layout, and destroys images. Residency
//! transitions live in `crate::residency` but operate on the same store.

mod format;
mod layout;
mod region;
mod store;
mod target;

pub use format::{PixelFormat, TexelBlock};
pub use layout::StorageLayout;
pub use region::{Extent, Region};
pub use store::{Image, ImageId, ImageStore, Residency};
pub use target::ImageTarget;
