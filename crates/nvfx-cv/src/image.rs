//! Exclusively owned vendor images.

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr::{self, NonNull};

use tracing::debug;

use nvfx_core::error::{FxError, Result, check_status};
use nvfx_core::runtime::GpuImage;
use nvfx_core::types::ImageDesc;

use crate::sys::{CvApi, NvCVImage};
use crate::transfer::RawImage;

/// A vendor image allocated by the library and destroyed on drop.
///
/// The header lives at a fixed address for the image's lifetime, so it can
/// be bound to a feature graph by pointer.
pub struct Image {
    api: &'static CvApi,
    ptr: NonNull<NvCVImage>,
    desc: ImageDesc,
}

impl Image {
    pub fn new(api: &'static CvApi, desc: &ImageDesc) -> Result<Self> {
        let mut raw: *mut NvCVImage = ptr::null_mut();
        // SAFETY: raw is a valid out-pointer; enum values come from the vendor header.
        let status = unsafe {
            (api.create)(
                desc.width,
                desc.height,
                desc.format.raw(),
                desc.component.raw(),
                desc.layout.raw(),
                desc.location.raw(),
                desc.alignment,
                &mut raw,
            )
        };
        check_status(status, |status| FxError::Vendor {
            operation: "NvCVImage_Create",
            status,
        })?;
        let ptr = NonNull::new(raw).ok_or_else(|| {
            FxError::InvariantViolation("NvCVImage_Create returned a null image".into())
        })?;
        debug!(
            width = desc.width,
            height = desc.height,
            format = ?desc.format,
            "Image created"
        );
        Ok(Self {
            api,
            ptr,
            desc: *desc,
        })
    }

    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    pub fn header(&self) -> &NvCVImage {
        // SAFETY: ptr is live and only mutated through &mut self.
        unsafe { self.ptr.as_ref() }
    }
}

impl GpuImage for Image {
    fn width(&self) -> u32 {
        self.desc.width
    }

    fn height(&self) -> u32 {
        self.desc.height
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let desc = self.desc.with_size(width, height);
        // SAFETY: ptr is an image created by NvCVImage_Create.
        let status = unsafe {
            (self.api.realloc)(
                self.ptr.as_ptr(),
                desc.width,
                desc.height,
                desc.format.raw(),
                desc.component.raw(),
                desc.layout.raw(),
                desc.location.raw(),
                desc.alignment,
            )
        };
        check_status(status, |status| FxError::Vendor {
            operation: "NvCVImage_Realloc",
            status,
        })?;
        debug!(width, height, "Image reallocated");
        self.desc = desc;
        Ok(())
    }

    fn as_object(&mut self) -> (*mut c_void, usize) {
        (self.ptr.as_ptr().cast(), size_of::<NvCVImage>())
    }
}

impl RawImage for Image {
    fn raw(&self) -> *const NvCVImage {
        self.ptr.as_ptr()
    }

    fn raw_mut(&mut self) -> *mut NvCVImage {
        self.ptr.as_ptr()
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        // SAFETY: created by NvCVImage_Create and destroyed exactly once.
        unsafe { (self.api.destroy)(self.ptr.as_ptr()) };
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("desc", &self.desc)
            .field("ptr", &self.ptr)
            .finish()
    }
}
