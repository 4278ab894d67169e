//! Owned feature handles.

use std::ffi::{CStr, CString, c_char, c_ulong, c_void};
use std::ptr::{self, NonNull};

use tracing::{debug, warn};

use nvfx_core::error::{FxError, NvCvStatus, Result, check_status};
use nvfx_core::ffi_types::CUstream;
use nvfx_core::runtime::FeatureGraph;

use crate::sys::ArApi;

fn c_key(key: &str) -> Result<CString> {
    CString::new(key)
        .map_err(|_| FxError::InvalidArgument(format!("parameter key {key:?} contains NUL")))
}

fn binding(key: &str) -> impl FnOnce(NvCvStatus) -> FxError + '_ {
    move |status| FxError::Binding {
        param: key.to_string(),
        status,
    }
}

/// A vendor feature instance, destroyed on drop.
pub struct Feature {
    api: &'static ArApi,
    handle: NonNull<c_void>,
    id: String,
}

impl Feature {
    pub fn new(api: &'static ArApi, feature_id: &str) -> Result<Self> {
        let cid = c_key(feature_id)?;
        let mut handle = ptr::null_mut();
        // SAFETY: cid is NUL-terminated and handle is a valid out-pointer.
        let status = unsafe { (api.create)(cid.as_ptr(), &mut handle) };
        check_status(status, |status| FxError::Vendor {
            operation: "NvAR_Create",
            status,
        })?;
        let handle = NonNull::new(handle).ok_or_else(|| {
            FxError::InvariantViolation(format!("NvAR_Create({feature_id}) returned null"))
        })?;
        debug!(feature = feature_id, "Feature created");
        Ok(Self {
            api,
            handle,
            id: feature_id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        let ckey = c_key(key)?;
        let mut out: *const c_char = ptr::null();
        // SAFETY: live handle, NUL-terminated key, valid out-pointer.
        let status = unsafe { (self.api.get_string)(self.handle.as_ptr(), ckey.as_ptr(), &mut out) };
        check_status(status, binding(key))?;
        if out.is_null() {
            return Ok(String::new());
        }
        // SAFETY: the SDK returns a NUL-terminated string owned by the feature.
        Ok(unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned())
    }
}

impl FeatureGraph for Feature {
    fn set_u32(&mut self, key: &str, value: u32) -> Result<()> {
        let ckey = c_key(key)?;
        // SAFETY: live handle and NUL-terminated key.
        let status = unsafe { (self.api.set_u32)(self.handle.as_ptr(), ckey.as_ptr(), value) };
        check_status(status, binding(key))
    }

    fn set_f32(&mut self, key: &str, value: f32) -> Result<()> {
        let ckey = c_key(key)?;
        // SAFETY: live handle and NUL-terminated key.
        let status = unsafe { (self.api.set_f32)(self.handle.as_ptr(), ckey.as_ptr(), value) };
        check_status(status, binding(key))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        let ckey = c_key(key)?;
        let cvalue = CString::new(value)
            .map_err(|_| FxError::InvalidArgument(format!("value for {key} contains NUL")))?;
        // SAFETY: live handle; the SDK copies the string.
        let status = unsafe {
            (self.api.set_string)(self.handle.as_ptr(), ckey.as_ptr(), cvalue.as_ptr())
        };
        check_status(status, binding(key))
    }

    fn set_cuda_stream(&mut self, key: &str, stream: CUstream) -> Result<()> {
        let ckey = c_key(key)?;
        // SAFETY: live handle; the stream is owned by the compute runtime.
        let status =
            unsafe { (self.api.set_cuda_stream)(self.handle.as_ptr(), ckey.as_ptr(), stream) };
        check_status(status, binding(key))
    }

    unsafe fn set_object(&mut self, key: &str, ptr: *mut c_void, size: usize) -> Result<()> {
        let ckey = c_key(key)?;
        let size = c_ulong::try_from(size)
            .map_err(|_| FxError::InvalidArgument(format!("object for {key} too large")))?;
        // SAFETY: the caller keeps ptr valid and pinned while bound.
        let status =
            unsafe { (self.api.set_object)(self.handle.as_ptr(), ckey.as_ptr(), ptr, size) };
        check_status(status, binding(key))
    }

    unsafe fn set_f32_array(&mut self, key: &str, ptr: *mut f32, len: usize) -> Result<()> {
        let ckey = c_key(key)?;
        let count = i32::try_from(len)
            .map_err(|_| FxError::InvalidArgument(format!("array for {key} too long")))?;
        // SAFETY: the caller keeps ptr valid and pinned while bound.
        let status =
            unsafe { (self.api.set_f32_array)(self.handle.as_ptr(), ckey.as_ptr(), ptr, count) };
        check_status(status, binding(key))
    }

    fn get_u32(&self, key: &str) -> Result<u32> {
        let ckey = c_key(key)?;
        let mut value = 0u32;
        // SAFETY: live handle, NUL-terminated key, valid out-pointer.
        let status = unsafe { (self.api.get_u32)(self.handle.as_ptr(), ckey.as_ptr(), &mut value) };
        check_status(status, binding(key))?;
        Ok(value)
    }

    fn get_f32(&self, key: &str) -> Result<f32> {
        let ckey = c_key(key)?;
        let mut value = 0f32;
        // SAFETY: live handle, NUL-terminated key, valid out-pointer.
        let status = unsafe { (self.api.get_f32)(self.handle.as_ptr(), ckey.as_ptr(), &mut value) };
        check_status(status, binding(key))?;
        Ok(value)
    }

    fn load(&mut self) -> Result<()> {
        // SAFETY: live handle.
        let status = unsafe { (self.api.load)(self.handle.as_ptr()) };
        check_status(status, |status| FxError::Load { status })?;
        debug!(feature = %self.id, "Feature loaded");
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        // SAFETY: live handle.
        let status = unsafe { (self.api.run)(self.handle.as_ptr()) };
        check_status(status, |status| FxError::Run { status })
    }
}

impl Drop for Feature {
    fn drop(&mut self) {
        // SAFETY: created by NvAR_Create and destroyed exactly once.
        let status = unsafe { (self.api.destroy)(self.handle.as_ptr()) };
        if status != 0 {
            warn!(feature = %self.id, status = %NvCvStatus(status), "NvAR_Destroy failed");
        }
    }
}

impl std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feature")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .finish()
    }
}
