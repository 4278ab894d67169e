//! Image descriptors and the vendor image enums.
//!
//! Discriminants are the values of the vendor C headers; they are passed
//! through FFI unchanged via [`PixelFormat::raw`] and friends.

/// Pixel channel order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PixelFormat {
    Unknown = 0,
    /// Luminance only.
    Y = 1,
    /// Alpha only.
    A = 2,
    /// Luminance + alpha.
    Ya = 3,
    Rgb = 4,
    Bgr = 5,
    Rgba = 6,
    Bgra = 7,
    Argb = 8,
    Abgr = 9,
    Yuv420 = 10,
    Yuv422 = 11,
    Yuv444 = 12,
}

impl PixelFormat {
    #[inline]
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Number of components per pixel.
    pub const fn components(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Y | Self::A => 1,
            Self::Ya => 2,
            Self::Rgb | Self::Bgr | Self::Yuv420 | Self::Yuv422 | Self::Yuv444 => 3,
            Self::Rgba | Self::Bgra | Self::Argb | Self::Abgr => 4,
        }
    }
}

/// Storage type of a single component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ComponentType {
    Unknown = 0,
    U8 = 1,
    U16 = 2,
    S16 = 3,
    F16 = 4,
    U32 = 5,
    S32 = 6,
    F32 = 7,
    U64 = 8,
    S64 = 9,
    F64 = 10,
}

impl ComponentType {
    #[inline]
    pub const fn raw(self) -> i32 {
        self as i32
    }

    pub const fn bytes(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::U8 => 1,
            Self::U16 | Self::S16 | Self::F16 => 2,
            Self::U32 | Self::S32 | Self::F32 => 4,
            Self::U64 | Self::S64 | Self::F64 => 8,
        }
    }
}

/// Arrangement of components in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentLayout {
    /// All components of a pixel are adjacent (`RGBRGB…`).
    Interleaved = 0,
    /// One plane per component (`RRR…GGG…BBB…`).
    Planar = 1,
}

impl ComponentLayout {
    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

/// Where the pixel buffer lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemoryLocation {
    Cpu = 0,
    Gpu = 1,
    CpuPinned = 2,
    CudaArray = 3,
}

impl MemoryLocation {
    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

/// Full description of a vendor image allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub component: ComponentType,
    pub layout: ComponentLayout,
    pub location: MemoryLocation,
    /// Row alignment in bytes (`1` = tightly packed).
    pub alignment: u32,
}

impl ImageDesc {
    pub const fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        component: ComponentType,
        layout: ComponentLayout,
        location: MemoryLocation,
    ) -> Self {
        Self {
            width,
            height,
            format,
            component,
            layout,
            location,
            alignment: 1,
        }
    }

    /// Same format with new dimensions.
    pub const fn with_size(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    /// Tightly packed byte size of one image with this description.
    pub const fn byte_size(&self) -> usize {
        (self.width as usize)
            * (self.height as usize)
            * (self.format.components() as usize)
            * (self.component.bytes() as usize)
    }
}
