//! Host (libobs) function table, resolved from the already-loaded host
//! library at first use.

use std::ffi::{c_char, c_void};
use std::sync::OnceLock;

use tracing::info;

use nvfx_core::dylib::Library;
use nvfx_core::error::{FxError, Result};

#[allow(non_camel_case_types)]
#[repr(C)]
pub struct obs_source_t {
    _private: [u8; 0],
}

#[allow(non_camel_case_types)]
#[repr(C)]
pub struct obs_weak_source_t {
    _private: [u8; 0],
}

#[allow(non_camel_case_types)]
#[repr(C)]
pub struct gs_texture_t {
    _private: [u8; 0],
}

/// `GS_RGBA_UNORM` from `enum gs_color_format`.
pub const GS_RGBA_UNORM: i32 = 19;
/// Texture may be bound as a render target.
pub const GS_RENDER_TARGET: u32 = 1 << 2;

/// Resolved host entry points.
///
/// Fields are public so embedders and tests can provide their own table.
pub struct ObsApi {
    pub enter_graphics: unsafe extern "C" fn(),
    pub leave_graphics: unsafe extern "C" fn(),

    pub texture_create: unsafe extern "C" fn(
        width: u32,
        height: u32,
        color_format: i32,
        levels: u32,
        data: *const *const u8,
        flags: u32,
    ) -> *mut gs_texture_t,
    pub texture_destroy: unsafe extern "C" fn(*mut gs_texture_t),
    pub texture_get_width: unsafe extern "C" fn(*const gs_texture_t) -> u32,
    pub texture_get_height: unsafe extern "C" fn(*const gs_texture_t) -> u32,
    pub texture_get_obj: unsafe extern "C" fn(*mut gs_texture_t) -> *mut c_void,
    pub copy_texture: unsafe extern "C" fn(dst: *mut gs_texture_t, src: *mut gs_texture_t),

    pub source_get_ref: unsafe extern "C" fn(*mut obs_source_t) -> *mut obs_source_t,
    pub source_release: unsafe extern "C" fn(*mut obs_source_t),
    pub source_get_weak_source: unsafe extern "C" fn(*mut obs_source_t) -> *mut obs_weak_source_t,
    pub source_get_name: unsafe extern "C" fn(*const obs_source_t) -> *const c_char,
    pub get_source_by_name: unsafe extern "C" fn(*const c_char) -> *mut obs_source_t,

    pub weak_source_addref: unsafe extern "C" fn(*mut obs_weak_source_t),
    pub weak_source_release: unsafe extern "C" fn(*mut obs_weak_source_t),
    pub weak_source_expired: unsafe extern "C" fn(*mut obs_weak_source_t) -> bool,
    pub weak_source_get_source: unsafe extern "C" fn(*mut obs_weak_source_t) -> *mut obs_source_t,
    pub weak_source_references_source:
        unsafe extern "C" fn(*mut obs_weak_source_t, *mut obs_source_t) -> bool,
}

static OBS_API: OnceLock<std::result::Result<ObsApi, String>> = OnceLock::new();

const HOST_LIBRARIES: &[&str] = if cfg!(windows) {
    &["obs.dll"]
} else if cfg!(target_os = "macos") {
    &["libobs.framework/libobs", "libobs.0.dylib"]
} else {
    &["libobs.so.0", "libobs.so"]
};

fn init_obs_api() -> std::result::Result<ObsApi, String> {
    let lib = Library::open_first(HOST_LIBRARIES.iter().copied()).map_err(|e| e.to_string())?;
    let api = load_table(&lib).map_err(|e| e.to_string())?;
    info!(library = lib.path(), "Host API resolved");
    Ok(api)
}

fn load_table(lib: &Library) -> Result<ObsApi> {
    // SAFETY: every field type matches the libobs C declaration of the symbol.
    unsafe {
        Ok(ObsApi {
            enter_graphics: lib.symbol("obs_enter_graphics")?,
            leave_graphics: lib.symbol("obs_leave_graphics")?,
            texture_create: lib.symbol("gs_texture_create")?,
            texture_destroy: lib.symbol("gs_texture_destroy")?,
            texture_get_width: lib.symbol("gs_texture_get_width")?,
            texture_get_height: lib.symbol("gs_texture_get_height")?,
            texture_get_obj: lib.symbol("gs_texture_get_obj")?,
            copy_texture: lib.symbol("gs_copy_texture")?,
            source_get_ref: lib.symbol("obs_source_get_ref")?,
            source_release: lib.symbol("obs_source_release")?,
            source_get_weak_source: lib.symbol("obs_source_get_weak_source")?,
            source_get_name: lib.symbol("obs_source_get_name")?,
            get_source_by_name: lib.symbol("obs_get_source_by_name")?,
            weak_source_addref: lib.symbol("obs_weak_source_addref")?,
            weak_source_release: lib.symbol("obs_weak_source_release")?,
            weak_source_expired: lib.symbol("obs_weak_source_expired")?,
            weak_source_get_source: lib.symbol("obs_weak_source_get_source")?,
            weak_source_references_source: lib.symbol("obs_weak_source_references_source")?,
        })
    }
}

/// The host function table.
pub fn api() -> Result<&'static ObsApi> {
    OBS_API
        .get_or_init(init_obs_api)
        .as_ref()
        .map_err(|err| FxError::LibraryLoad(format!("failed to resolve host API: {err}")))
}
