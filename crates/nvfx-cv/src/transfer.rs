//! Pixel format conversion between vendor images.

use nvfx_core::error::{FxError, Result, check_status};
use nvfx_core::ffi_types::CUstream;

use crate::sys::{CvApi, NvCVImage};

/// Access to the vendor image header behind a wrapper.
pub trait RawImage {
    fn raw(&self) -> *const NvCVImage;
    fn raw_mut(&mut self) -> *mut NvCVImage;
}

/// Convert `src` into the format of `dst` on `stream`.
///
/// `tmp` is staging memory for conversions that need an intermediate
/// layout; the library grows it as needed.  Both images must already be
/// accessible to CUDA (texture-backed images mapped).
pub fn transfer<S, D>(
    api: &CvApi,
    src: &S,
    dst: &mut D,
    scale: f32,
    stream: CUstream,
    tmp: Option<&mut dyn RawImage>,
) -> Result<()>
where
    S: RawImage + ?Sized,
    D: RawImage + ?Sized,
{
    let tmp = tmp.map_or(std::ptr::null_mut(), |t| t.raw_mut());
    // SAFETY: all headers are live for the call; tmp may be null.
    let status = unsafe { (api.transfer)(src.raw(), dst.raw_mut(), scale, stream, tmp) };
    check_status(status, |status| FxError::Transfer { status })
}
