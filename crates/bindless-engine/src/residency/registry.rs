use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::Key;

use crate::device::DeviceBackend;
use crate::error::{Result, TextureError};
use crate::image::{ImageId, ImageStore, Residency};

use super::{HandleSet, ResidentHandle};

/// Grant serials are shared by every registry in the process, so a handle
/// minted by one store is unknown to all others.
static NEXT_SERIAL: AtomicU32 = AtomicU32::new(1);

fn next_serial() -> u32 {
    loop {
        // Serial 0 is reserved so that no handle is null.
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        if serial != 0 {
            return serial;
        }
    }
}

/// Ledger of issued handles.
///
/// Live handles map to their image. Retired handles keep their image so a
/// handle presented after release or destruction is classified instead of
/// being reported as unknown; whether it was destroyed is a per-image fact.
/// The ledger grows with the number of grants.
#[derive(Debug, Default)]
pub struct ResidencyRegistry {
    live: HashMap<ResidentHandle, ImageId>,
    retired: HashMap<ResidentHandle, ImageId>,
    destroyed: HashSet<ImageId>,
}

impl ResidencyRegistry {
    /// Number of images currently resident.
    pub fn resident_count(&self) -> usize {
        self.live.len()
    }

    /// Resolves a handle to its image if it is currently valid.
    pub fn validate(&self, handle: ResidentHandle) -> Result<ImageId> {
        if let Some(id) = self.live.get(&handle) {
            return Ok(*id);
        }
        match self.retired.get(&handle) {
            Some(id) if self.destroyed.contains(id) => Err(TextureError::UseAfterDestroy(handle)),
            Some(_) => Err(TextureError::StaleHandle(handle)),
            None => Err(TextureError::UnknownHandle(handle)),
        }
    }

    fn grant(&mut self, id: ImageId) -> ResidentHandle {
        let slot = id.data().as_ffi() as u32;
        let handle = ResidentHandle::pack(slot, next_serial());
        self.live.insert(handle, id);
        handle
    }

    fn release(&mut self, handle: ResidentHandle) {
        if let Some(id) = self.live.remove(&handle) {
            self.retired.insert(handle, id);
        }
    }

    /// Retires every handle ever issued for `id` as destroyed.
    pub(crate) fn retire_destroyed(&mut self, id: ImageId, residency: Residency) {
        if let Residency::Resident(handle) = residency {
            self.release(handle);
        }
        self.destroyed.insert(id);
    }
}

// residency transitions
impl<B: DeviceBackend> ImageStore<B> {
    /// NonResident → Resident. Returns the new handle.
    ///
    /// Strict: a second request without an intervening release fails with
    /// `AlreadyResident` and the first handle stays the only valid one.
    pub fn make_resident(&mut self, id: ImageId) -> Result<ResidentHandle> {
        self.context.require_bindless()?;
        let limit = self.context.capabilities().max_resident_images;

        let image = self.images.get_mut(id).ok_or(TextureError::DestroyedImage(id))?;
        if image.is_resident() {
            return Err(TextureError::AlreadyResident(id));
        }
        let Some(layout) = image.layout else {
            return Err(TextureError::Unallocated(id));
        };
        if self.registry.resident_count() >= limit as usize {
            return Err(TextureError::ResidencyLimit { limit });
        }

        self.context.backend_mut().make_resident(&mut image.raw, &layout)?;
        let handle = self.registry.grant(id);
        image.residency = Residency::Resident(handle);

        log::debug!("image {id:?} resident as {handle}");
        Ok(handle)
    }

    /// Resident → NonResident. The handle returned by `make_resident` is
    /// invalid afterwards.
    pub fn make_non_resident(&mut self, id: ImageId) -> Result<()> {
        let image = self.images.get_mut(id).ok_or(TextureError::DestroyedImage(id))?;
        let Residency::Resident(handle) = image.residency else {
            return Err(TextureError::NotResident(id));
        };

        self.context.backend_mut().make_non_resident(&mut image.raw);
        image.residency = Residency::NonResident;
        self.registry.release(handle);

        log::debug!("image {id:?} released handle {handle}");
        Ok(())
    }

    /// Pure query. Destroyed images are not resident.
    pub fn is_resident(&self, id: ImageId) -> bool {
        self.images.get(id).is_some_and(|image| image.is_resident())
    }

    /// Current handle of `id`, if resident.
    pub fn texture_handle(&self, id: ImageId) -> Option<ResidentHandle> {
        match self.images.get(id)?.residency {
            Residency::Resident(handle) => Some(handle),
            Residency::NonResident => None,
        }
    }

    /// Validity check applied to every handle before it is consumed.
    pub fn validate_handle(&self, handle: ResidentHandle) -> Result<ImageId> {
        self.registry.validate(handle)
    }

    /// Makes `ids` resident in ascending index order and collects the
    /// handles in the same order: `set[k]` belongs to `ids[k]`.
    ///
    /// On failure the residency granted by this call is released again and
    /// the error of the failing image is returned.
    pub fn make_resident_all<const N: usize>(&mut self, ids: [ImageId; N]) -> Result<HandleSet<N>> {
        let mut handles = [ResidentHandle::NULL; N];

        for (k, id) in ids.iter().enumerate() {
            match self.make_resident(*id) {
                Ok(handle) => handles[k] = handle,
                Err(err) => {
                    for granted in &ids[..k] {
                        if let Err(undo) = self.make_non_resident(*granted) {
                            log::warn!("rollback of {granted:?} failed: {undo}");
                        }
                    }
                    return Err(err);
                }
            }
        }

        Ok(HandleSet::new(handles))
    }

    /// Releases every image of `set`. All handles are validated first and a
    /// handle listed twice fails with `DuplicateHandle`; on error nothing is
    /// released.
    pub fn make_non_resident_all<const N: usize>(&mut self, set: &HandleSet<N>) -> Result<()> {
        let ids = set.validate(self)?;
        for (k, id) in ids.iter().enumerate() {
            if ids[..k].contains(id) {
                return Err(TextureError::DuplicateHandle(set[k]));
            }
        }
        for id in ids {
            self.make_non_resident(id)?;
        }
        Ok(())
    }
}
