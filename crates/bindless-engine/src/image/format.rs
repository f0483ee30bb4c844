use std::fmt;

/// Pixel formats understood by the store.
///
/// Uncompressed formats are addressed per texel; block-compressed formats per
/// 4×4 block. Both are described uniformly by [`TexelBlock`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgba8,
    Rgba8Srgb,
    Bgra8,
    R16Float,
    Rgba16Float,
    R32Float,
    Rgba32Float,
    R32Uint,
    /// BC1 (DXT1) with 1-bit alpha.
    Bc1Rgba,
    /// BC3 (DXT5).
    Bc3Rgba,
}

/// Smallest addressable unit of a format.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TexelBlock {
    /// Block width in texels.
    pub width: u32,
    /// Block height in texels.
    pub height: u32,
    /// Bytes per block.
    pub bytes: u32,
}

impl TexelBlock {
    const fn texel(bytes: u32) -> Self {
        Self { width: 1, height: 1, bytes }
    }

    const fn compressed(bytes: u32) -> Self {
        Self { width: 4, height: 4, bytes }
    }

    /// Number of blocks needed to cover `texels` along the x axis.
    pub const fn columns(self, texels: u32) -> u32 {
        texels.div_ceil(self.width)
    }

    /// Number of blocks needed to cover `texels` along the y axis.
    pub const fn rows(self, texels: u32) -> u32 {
        texels.div_ceil(self.height)
    }
}

impl fmt::Display for TexelBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl PixelFormat {
    pub const fn block(self) -> TexelBlock {
        match self {
            PixelFormat::R8 => TexelBlock::texel(1),
            PixelFormat::Rg8 | PixelFormat::R16Float => TexelBlock::texel(2),
            PixelFormat::Rgba8
            | PixelFormat::Rgba8Srgb
            | PixelFormat::Bgra8
            | PixelFormat::R32Float
            | PixelFormat::R32Uint => TexelBlock::texel(4),
            PixelFormat::Rgba16Float => TexelBlock::texel(8),
            PixelFormat::Rgba32Float => TexelBlock::texel(16),
            PixelFormat::Bc1Rgba => TexelBlock::compressed(8),
            PixelFormat::Bc3Rgba => TexelBlock::compressed(16),
        }
    }

    pub const fn is_compressed(self) -> bool {
        matches!(self, PixelFormat::Bc1Rgba | PixelFormat::Bc3Rgba)
    }

    /// Sampled as float through a filtering sampler without extra features.
    ///
    /// 32-bit float formats need `FLOAT32_FILTERABLE`; integer formats are
    /// never filterable.
    pub const fn is_filterable_float(self) -> bool {
        !matches!(
            self,
            PixelFormat::R32Float | PixelFormat::Rgba32Float | PixelFormat::R32Uint
        )
    }

    /// Bytes per texel; `None` for block-compressed formats.
    pub const fn bytes_per_texel(self) -> Option<u32> {
        if self.is_compressed() {
            None
        } else {
            Some(self.block().bytes)
        }
    }
}
