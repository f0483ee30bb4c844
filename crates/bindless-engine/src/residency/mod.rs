//! Resident handle registry.
//!
//! State machine per image: `NonResident` (initial) → `Resident` through
//! `ImageStore::make_resident`, and back through `make_non_resident`. Each
//! grant mints a fresh 64-bit handle; the registry remembers retired handles
//! so a stale one can be told apart from a destroyed one when it is
//! presented again.

mod handle;
mod handle_set;
mod registry;

pub use handle::ResidentHandle;
pub use handle_set::HandleSet;
pub use registry::ResidencyRegistry;
