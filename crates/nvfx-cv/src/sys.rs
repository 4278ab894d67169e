//! `NvCVImage` FFI: the image header layout and the function table.

use std::ffi::{CStr, OsStr, c_char, c_void};
use std::ptr;
use std::sync::OnceLock;

use tracing::info;

use nvfx_core::dylib::Library;
use nvfx_core::error::{FxError, NvCvStatus, Result};
use nvfx_core::ffi_types::CUstream;

/// Vendor image header.  Field order and widths match `nvCVImage.h`.
#[repr(C)]
#[derive(Debug)]
pub struct NvCVImage {
    pub width: u32,
    pub height: u32,
    pub pitch: i32,
    pub pixel_format: i32,
    pub component_type: i32,
    pub pixel_bytes: u8,
    pub component_bytes: u8,
    pub num_components: u8,
    pub planar: u8,
    pub gpu_mem: u8,
    pub colorspace: u8,
    pub reserved: [u8; 2],
    pub pixels: *mut c_void,
    pub delete_ptr: *mut c_void,
    pub delete_proc: Option<unsafe extern "C" fn(*mut c_void)>,
    pub buffer_bytes: u64,
}

impl Default for NvCVImage {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            pitch: 0,
            pixel_format: 0,
            component_type: 0,
            pixel_bytes: 0,
            component_bytes: 0,
            num_components: 0,
            planar: 0,
            gpu_mem: 0,
            colorspace: 0,
            reserved: [0; 2],
            pixels: ptr::null_mut(),
            delete_ptr: ptr::null_mut(),
            delete_proc: None,
            buffer_bytes: 0,
        }
    }
}

pub type NvCvStatusRaw = i32;

type CreateFn = unsafe extern "C" fn(
    width: u32,
    height: u32,
    format: i32,
    component: i32,
    layout: u32,
    mem_space: u32,
    alignment: u32,
    out: *mut *mut NvCVImage,
) -> NvCvStatusRaw;
type ReallocFn = unsafe extern "C" fn(
    im: *mut NvCVImage,
    width: u32,
    height: u32,
    format: i32,
    component: i32,
    layout: u32,
    mem_space: u32,
    alignment: u32,
) -> NvCvStatusRaw;
type TransferFn = unsafe extern "C" fn(
    src: *const NvCVImage,
    dst: *mut NvCVImage,
    scale: f32,
    stream: CUstream,
    tmp: *mut NvCVImage,
) -> NvCvStatusRaw;
type InitFromD3D11Fn = unsafe extern "C" fn(im: *mut NvCVImage, tex: *mut c_void) -> NvCvStatusRaw;
type MapFn = unsafe extern "C" fn(im: *mut NvCVImage, stream: CUstream) -> NvCvStatusRaw;

/// Resolved `NvCVImage` entry points.
pub struct CvApi {
    pub create: CreateFn,
    pub destroy: unsafe extern "C" fn(*mut NvCVImage),
    pub realloc: ReallocFn,
    pub dealloc: unsafe extern "C" fn(*mut NvCVImage),
    pub transfer: TransferFn,
    pub error_string: unsafe extern "C" fn(NvCvStatusRaw) -> *const c_char,
    /// Texture interop symbols only exist in Direct3D builds of the library.
    pub init_from_d3d11_texture: Option<InitFromD3D11Fn>,
    pub map_resource: Option<MapFn>,
    pub unmap_resource: Option<MapFn>,
}

impl CvApi {
    /// Vendor description of a status code.
    pub fn error_string(&self, status: NvCvStatus) -> String {
        // SAFETY: the library returns a static string for every code.
        let raw = unsafe { (self.error_string)(status.0) };
        if raw.is_null() {
            return status.name().to_string();
        }
        // SAFETY: raw is a NUL-terminated static string.
        unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
    }

    pub fn supports_texture_interop(&self) -> bool {
        self.init_from_d3d11_texture.is_some()
            && self.map_resource.is_some()
            && self.unmap_resource.is_some()
    }
}

static CV_API: OnceLock<std::result::Result<CvApi, String>> = OnceLock::new();

fn load_table(lib: &Library) -> Result<CvApi> {
    // SAFETY: every field type matches the nvCVImage.h declaration of the symbol.
    unsafe {
        Ok(CvApi {
            create: lib.symbol("NvCVImage_Create")?,
            destroy: lib.symbol("NvCVImage_Destroy")?,
            realloc: lib.symbol("NvCVImage_Realloc")?,
            dealloc: lib.symbol("NvCVImage_Dealloc")?,
            transfer: lib.symbol("NvCVImage_Transfer")?,
            error_string: lib.symbol("NvCV_GetErrorStringFromCode")?,
            init_from_d3d11_texture: lib.optional_symbol("NvCVImage_InitFromD3D11Texture"),
            map_resource: lib.optional_symbol("NvCVImage_MapResource"),
            unmap_resource: lib.optional_symbol("NvCVImage_UnmapResource"),
        })
    }
}

/// Load the image library from the first candidate that opens.
///
/// Only the first call loads; later calls return the same table.
pub fn load<I, P>(candidates: I) -> Result<&'static CvApi>
where
    I: IntoIterator<Item = P>,
    P: AsRef<OsStr>,
{
    CV_API
        .get_or_init(|| {
            let lib = Library::open_first(candidates).map_err(|e| e.to_string())?;
            let api = load_table(&lib).map_err(|e| e.to_string())?;
            info!(
                library = lib.path(),
                texture_interop = api.supports_texture_interop(),
                "NvCVImage library loaded"
            );
            Ok(api)
        })
        .as_ref()
        .map_err(|err| FxError::LibraryLoad(format!("failed to load NvCVImage: {err}")))
}
