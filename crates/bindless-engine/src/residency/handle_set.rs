use std::ops::Index;

use crate::device::DeviceBackend;
use crate::error::Result;
use crate::image::{ImageId, ImageStore};

use super::ResidentHandle;

/// Ordered, fixed-size array of handles for one rendering pass.
///
/// Index `k` is what a shader-side selector value `k` resolves to. The set
/// is owned by the caller; the store keeps no reference to it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HandleSet<const N: usize> {
    handles: [ResidentHandle; N],
}

impl<const N: usize> HandleSet<N> {
    pub const fn new(handles: [ResidentHandle; N]) -> Self {
        Self { handles }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> Option<ResidentHandle> {
        self.handles.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ResidentHandle> + '_ {
        self.handles.iter().copied()
    }

    pub fn as_slice(&self) -> &[ResidentHandle] {
        &self.handles
    }

    /// Raw tokens, in order.
    pub fn to_raw(&self) -> [u64; N] {
        self.handles.map(ResidentHandle::raw)
    }

    /// Byte view for upload into GPU-visible buffers.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.handles)
    }

    /// Checks every handle against `store` and returns their images in order.
    ///
    /// Fails with the error of the first handle that is not live:
    /// `StaleHandle`, `UseAfterDestroy` or `UnknownHandle`.
    pub fn validate<B: DeviceBackend>(&self, store: &ImageStore<B>) -> Result<[ImageId; N]> {
        let mut ids = [ImageId::default(); N];
        for (slot, handle) in ids.iter_mut().zip(self.handles) {
            *slot = store.validate_handle(handle)?;
        }
        Ok(ids)
    }
}

impl<const N: usize> Index<usize> for HandleSet<N> {
    type Output = ResidentHandle;

    fn index(&self, index: usize) -> &ResidentHandle {
        &self.handles[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order() {
        let set = HandleSet::new([
            ResidentHandle::from_raw(30),
            ResidentHandle::from_raw(10),
            ResidentHandle::from_raw(20),
        ]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_raw(), [30, 10, 20]);
        assert_eq!(set[1].raw(), 10);
        assert_eq!(set.get(3), None);
    }

    #[test]
    fn byte_view_matches_raw_tokens() {
        let set = HandleSet::new([ResidentHandle::from_raw(1)]);
        assert_eq!(set.as_bytes().len(), 8);
        assert_eq!(u64::from_ne_bytes(set.as_bytes().try_into().unwrap()), 1);
    }
}
