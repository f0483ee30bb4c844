use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Opaque 64-bit bindless handle.
///
/// Packed as `(image slot << 32) | grant serial`. The serial is nonzero and
/// unique per grant, so no valid handle is zero and a re-granted image never
/// gets its old handle back. Shader-side data may carry handles verbatim;
/// the layout is `#[repr(transparent)]` over `u64`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Pod, Zeroable)]
pub struct ResidentHandle(u64);

impl ResidentHandle {
    pub const NULL: Self = Self(0);

    pub(crate) const fn pack(slot: u32, serial: u32) -> Self {
        Self(((slot as u64) << 32) | serial as u64)
    }

    /// Reinterprets a raw token, e.g. one read back from GPU-visible data.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResidentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_keeps_slot_and_serial_apart() {
        let h = ResidentHandle::pack(3, 7);
        assert_eq!(h.raw(), (3u64 << 32) | 7);
        assert!(!h.is_null());
    }

    #[test]
    fn raw_round_trip() {
        let h = ResidentHandle::pack(1, 2);
        assert_eq!(ResidentHandle::from_raw(h.raw()), h);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        assert_eq!(ResidentHandle::pack(1, 1).to_string(), "0x0000000100000001");
    }

    #[test]
    fn handles_cast_to_u64_slices() {
        let hs = [ResidentHandle::pack(0, 1), ResidentHandle::pack(0, 2)];
        let raw: &[u64] = bytemuck::cast_slice(&hs);
        assert_eq!(raw, &[1, 2]);
    }
}
