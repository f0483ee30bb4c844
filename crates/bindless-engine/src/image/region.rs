use std::fmt;

use super::TexelBlock;

/// Size of an image level in texels.
///
/// Unused axes are 1 (a 2D image has `depth == 1`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    pub const fn d1(width: u32) -> Self {
        Self::new(width, 1, 1)
    }

    pub const fn d2(width: u32, height: u32) -> Self {
        Self::new(width, height, 1)
    }

    pub const fn d3(width: u32, height: u32, depth: u32) -> Self {
        Self::new(width, height, depth)
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    pub const fn texel_count(self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    /// Largest axis.
    pub fn max_axis(self) -> u32 {
        self.width.max(self.height).max(self.depth)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Box inside an image level: texel offset plus extent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub extent: Extent,
}

impl Region {
    pub const fn new(offset: [u32; 3], extent: Extent) -> Self {
        Self {
            x: offset[0],
            y: offset[1],
            z: offset[2],
            extent,
        }
    }

    /// 2D rectangle at depth slice 0.
    pub const fn d2(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new([x, y, 0], Extent::d2(width, height))
    }

    /// The whole of a level.
    pub const fn full(extent: Extent) -> Self {
        Self::new([0, 0, 0], extent)
    }

    pub const fn texel_count(&self) -> u64 {
        self.extent.texel_count()
    }

    /// True if the region is non-empty and lies entirely inside `bounds`.
    pub fn fits_within(&self, bounds: Extent) -> bool {
        let fits = |offset: u32, len: u32, limit: u32| {
            offset.checked_add(len).is_some_and(|end| end <= limit)
        };

        !self.extent.is_empty()
            && fits(self.x, self.extent.width, bounds.width)
            && fits(self.y, self.extent.height, bounds.height)
            && fits(self.z, self.extent.depth, bounds.depth)
    }

    /// True if the region starts on a block boundary and either spans whole
    /// blocks or runs to the edge of `bounds`.
    pub fn is_block_aligned(&self, block: TexelBlock, bounds: Extent) -> bool {
        let axis = |offset: u32, len: u32, limit: u32, block: u32| {
            offset % block == 0 && (len % block == 0 || offset + len == limit)
        };

        axis(self.x, self.extent.width, bounds.width, block.width)
            && axis(self.y, self.extent.height, bounds.height, block.height)
    }

    /// Number of bytes a tightly packed upload of this region occupies.
    ///
    /// `None` when the size does not fit in `usize`.
    pub fn byte_len(&self, block: TexelBlock) -> Option<usize> {
        let columns = u64::from(block.columns(self.extent.width));
        let rows = u64::from(block.rows(self.extent.height));
        let bytes = columns
            .checked_mul(rows)?
            .checked_mul(u64::from(self.extent.depth))?
            .checked_mul(u64::from(block.bytes))?;
        usize::try_from(bytes).ok()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({},{},{})", self.extent, self.x, self.y, self.z)
    }
}
