use std::fmt;

/// Shape of an image.
///
/// The set is closed; every backend dispatches on it with a plain `match`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ImageTarget {
    Texture1D,
    Texture2D,
    Texture3D,
    Texture2DMultisample,
    /// Texel buffer: a 1D run of texels without mip levels.
    Buffer,
}

impl ImageTarget {
    pub const ALL: [ImageTarget; 5] = [
        ImageTarget::Texture1D,
        ImageTarget::Texture2D,
        ImageTarget::Texture3D,
        ImageTarget::Texture2DMultisample,
        ImageTarget::Buffer,
    ];

    /// Number of axes that carry a size (1, 2 or 3).
    pub const fn dimensions(self) -> u32 {
        match self {
            ImageTarget::Texture1D | ImageTarget::Buffer => 1,
            ImageTarget::Texture2D | ImageTarget::Texture2DMultisample => 2,
            ImageTarget::Texture3D => 3,
        }
    }

    pub const fn is_multisample(self) -> bool {
        matches!(self, ImageTarget::Texture2DMultisample)
    }

    /// Whether the shape can hold more than one mip level.
    pub const fn has_mipmaps(self) -> bool {
        !matches!(self, ImageTarget::Texture2DMultisample | ImageTarget::Buffer)
    }

    /// Whether texel data can be written from the host.
    ///
    /// Multisample images are only ever filled by rendering.
    pub const fn accepts_uploads(self) -> bool {
        !self.is_multisample()
    }
}

impl fmt::Display for ImageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageTarget::Texture1D => "1D",
            ImageTarget::Texture2D => "2D",
            ImageTarget::Texture3D => "3D",
            ImageTarget::Texture2DMultisample => "2D multisample",
            ImageTarget::Buffer => "buffer",
        };
        f.write_str(name)
    }
}
