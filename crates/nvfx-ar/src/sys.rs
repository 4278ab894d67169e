//! `NvAR` function table, loaded at runtime.

use std::ffi::{OsStr, c_char, c_ulong, c_void};
use std::sync::OnceLock;

use tracing::info;

use nvfx_core::dylib::Library;
use nvfx_core::error::{FxError, Result};
use nvfx_core::ffi_types::CUstream;

pub type NvArHandle = *mut c_void;
type Status = i32;

/// Resolved `NvAR` entry points.
pub struct ArApi {
    pub create: unsafe extern "C" fn(feature_id: *const c_char, handle: *mut NvArHandle) -> Status,
    pub destroy: unsafe extern "C" fn(NvArHandle) -> Status,
    pub load: unsafe extern "C" fn(NvArHandle) -> Status,
    pub run: unsafe extern "C" fn(NvArHandle) -> Status,

    pub set_u32: unsafe extern "C" fn(NvArHandle, *const c_char, u32) -> Status,
    pub set_f32: unsafe extern "C" fn(NvArHandle, *const c_char, f32) -> Status,
    pub set_string: unsafe extern "C" fn(NvArHandle, *const c_char, *const c_char) -> Status,
    pub set_cuda_stream: unsafe extern "C" fn(NvArHandle, *const c_char, CUstream) -> Status,
    pub set_object:
        unsafe extern "C" fn(NvArHandle, *const c_char, *mut c_void, type_size: c_ulong) -> Status,
    pub set_f32_array:
        unsafe extern "C" fn(NvArHandle, *const c_char, *mut f32, count: i32) -> Status,

    pub get_u32: unsafe extern "C" fn(NvArHandle, *const c_char, *mut u32) -> Status,
    pub get_f32: unsafe extern "C" fn(NvArHandle, *const c_char, *mut f32) -> Status,
    pub get_string: unsafe extern "C" fn(NvArHandle, *const c_char, *mut *const c_char) -> Status,
}

static AR_API: OnceLock<std::result::Result<ArApi, String>> = OnceLock::new();

fn load_table(lib: &Library) -> Result<ArApi> {
    // SAFETY: every field type matches the nvAR.h declaration of the symbol.
    unsafe {
        Ok(ArApi {
            create: lib.symbol("NvAR_Create")?,
            destroy: lib.symbol("NvAR_Destroy")?,
            load: lib.symbol("NvAR_Load")?,
            run: lib.symbol("NvAR_Run")?,
            set_u32: lib.symbol("NvAR_SetU32")?,
            set_f32: lib.symbol("NvAR_SetF32")?,
            set_string: lib.symbol("NvAR_SetString")?,
            set_cuda_stream: lib.symbol("NvAR_SetCudaStream")?,
            set_object: lib.symbol("NvAR_SetObject")?,
            set_f32_array: lib.symbol("NvAR_SetF32Array")?,
            get_u32: lib.symbol("NvAR_GetU32")?,
            get_f32: lib.symbol("NvAR_GetF32")?,
            get_string: lib.symbol("NvAR_GetString")?,
        })
    }
}

/// Load the feature library from the first candidate that opens.
///
/// Only the first call loads; later calls return the same table.
pub fn load<I, P>(candidates: I) -> Result<&'static ArApi>
where
    I: IntoIterator<Item = P>,
    P: AsRef<OsStr>,
{
    AR_API
        .get_or_init(|| {
            let lib = Library::open_first(candidates).map_err(|e| e.to_string())?;
            let api = load_table(&lib).map_err(|e| e.to_string())?;
            info!(library = lib.path(), "NvAR library loaded");
            Ok(api)
        })
        .as_ref()
        .map_err(|err| FxError::LibraryLoad(format!("failed to load NvAR: {err}")))
}
