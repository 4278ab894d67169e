//! In-process stand-in for the image library used by unit tests.

use std::cell::Cell;
use std::ffi::{c_char, c_void};
use std::ptr;

use nvfx_core::ffi_types::CUstream;
use nvfx_obs::ObsApi;
use nvfx_obs::sys::{gs_texture_t, obs_source_t, obs_weak_source_t};

use crate::sys::{CvApi, NvCVImage};

thread_local! {
    pub static LIVE: Cell<i32> = const { Cell::new(0) };
    pub static REALLOCS: Cell<u32> = const { Cell::new(0) };
    pub static TRANSFER_STATUS: Cell<i32> = const { Cell::new(0) };
    pub static TRANSFER_HAD_TMP: Cell<bool> = const { Cell::new(false) };
    pub static MAPPED: Cell<i32> = const { Cell::new(0) };
    pub static INITS: Cell<u32> = const { Cell::new(0) };
    pub static INIT_STATUS: Cell<i32> = const { Cell::new(0) };
    pub static TEXTURES_LIVE: Cell<i32> = const { Cell::new(0) };
}

unsafe extern "C" fn create(
    width: u32,
    height: u32,
    format: i32,
    component: i32,
    _layout: u32,
    mem_space: u32,
    _alignment: u32,
    out: *mut *mut NvCVImage,
) -> i32 {
    if width == 0 || height == 0 {
        return -16;
    }
    let image = NvCVImage {
        width,
        height,
        pixel_format: format,
        component_type: component,
        gpu_mem: mem_space as u8,
        ..NvCVImage::default()
    };
    LIVE.with(|c| c.set(c.get() + 1));
    unsafe { *out = Box::into_raw(Box::new(image)) };
    0
}

unsafe extern "C" fn destroy(im: *mut NvCVImage) {
    LIVE.with(|c| c.set(c.get() - 1));
    drop(unsafe { Box::from_raw(im) });
}

unsafe extern "C" fn realloc(
    im: *mut NvCVImage,
    width: u32,
    height: u32,
    _format: i32,
    _component: i32,
    _layout: u32,
    _mem_space: u32,
    _alignment: u32,
) -> i32 {
    REALLOCS.with(|c| c.set(c.get() + 1));
    let im = unsafe { &mut *im };
    im.width = width;
    im.height = height;
    0
}

unsafe extern "C" fn dealloc(_im: *mut NvCVImage) {}

unsafe extern "C" fn transfer(
    _src: *const NvCVImage,
    _dst: *mut NvCVImage,
    _scale: f32,
    _stream: CUstream,
    tmp: *mut NvCVImage,
) -> i32 {
    TRANSFER_HAD_TMP.with(|c| c.set(!tmp.is_null()));
    TRANSFER_STATUS.with(Cell::get)
}

unsafe extern "C" fn error_string(code: i32) -> *const c_char {
    match code {
        -9 => c"The pixel format is not supported.".as_ptr(),
        _ => c"An error has occurred.".as_ptr(),
    }
}

unsafe extern "C" fn map(_im: *mut NvCVImage, _stream: CUstream) -> i32 {
    MAPPED.with(|c| c.set(c.get() + 1));
    0
}

unsafe extern "C" fn unmap(_im: *mut NvCVImage, _stream: CUstream) -> i32 {
    MAPPED.with(|c| c.set(c.get() - 1));
    0
}

unsafe extern "C" fn init_from_texture(im: *mut NvCVImage, tex: *mut c_void) -> i32 {
    INITS.with(|c| c.set(c.get() + 1));
    let status = INIT_STATUS.with(Cell::get);
    if status != 0 {
        return status;
    }
    let size = unsafe { &*tex.cast::<(u32, u32)>() };
    let im = unsafe { &mut *im };
    im.width = size.0;
    im.height = size.1;
    im.gpu_mem = 1;
    0
}

pub static FAKE_API: CvApi = CvApi {
    create,
    destroy,
    realloc,
    dealloc,
    transfer,
    error_string,
    init_from_d3d11_texture: None,
    map_resource: None,
    unmap_resource: None,
};

pub static FAKE_INTEROP_API: CvApi = CvApi {
    create,
    destroy,
    realloc,
    dealloc,
    transfer,
    error_string,
    init_from_d3d11_texture: Some(init_from_texture),
    map_resource: Some(map),
    unmap_resource: Some(unmap),
};

// Host textures are boxed `(width, height)` pairs; the native object is the
// box itself.

unsafe extern "C" fn graphics_noop() {}

unsafe extern "C" fn texture_create(
    width: u32,
    height: u32,
    _color_format: i32,
    _levels: u32,
    _data: *const *const u8,
    _flags: u32,
) -> *mut gs_texture_t {
    TEXTURES_LIVE.with(|c| c.set(c.get() + 1));
    Box::into_raw(Box::new((width, height))).cast()
}

unsafe extern "C" fn texture_destroy(tex: *mut gs_texture_t) {
    TEXTURES_LIVE.with(|c| c.set(c.get() - 1));
    drop(unsafe { Box::from_raw(tex.cast::<(u32, u32)>()) });
}

unsafe extern "C" fn texture_get_width(tex: *const gs_texture_t) -> u32 {
    unsafe { (*tex.cast::<(u32, u32)>()).0 }
}

unsafe extern "C" fn texture_get_height(tex: *const gs_texture_t) -> u32 {
    unsafe { (*tex.cast::<(u32, u32)>()).1 }
}

unsafe extern "C" fn texture_get_obj(tex: *mut gs_texture_t) -> *mut c_void {
    tex.cast()
}

unsafe extern "C" fn copy_texture(_dst: *mut gs_texture_t, _src: *mut gs_texture_t) {}

unsafe extern "C" fn source_null(_source: *mut obs_source_t) -> *mut obs_source_t {
    ptr::null_mut()
}

unsafe extern "C" fn source_release(_source: *mut obs_source_t) {}

unsafe extern "C" fn source_get_weak_source(_source: *mut obs_source_t) -> *mut obs_weak_source_t {
    ptr::null_mut()
}

unsafe extern "C" fn source_get_name(_source: *const obs_source_t) -> *const c_char {
    c"".as_ptr()
}

unsafe extern "C" fn get_source_by_name(_name: *const c_char) -> *mut obs_source_t {
    ptr::null_mut()
}

unsafe extern "C" fn weak_noop(_weak: *mut obs_weak_source_t) {}

unsafe extern "C" fn weak_expired(_weak: *mut obs_weak_source_t) -> bool {
    true
}

unsafe extern "C" fn weak_get_source(_weak: *mut obs_weak_source_t) -> *mut obs_source_t {
    ptr::null_mut()
}

unsafe extern "C" fn weak_references(
    _weak: *mut obs_weak_source_t,
    _source: *mut obs_source_t,
) -> bool {
    false
}

pub static FAKE_HOST: ObsApi = ObsApi {
    enter_graphics: graphics_noop,
    leave_graphics: graphics_noop,
    texture_create,
    texture_destroy,
    texture_get_width,
    texture_get_height,
    texture_get_obj,
    copy_texture,
    source_get_ref: source_null,
    source_release,
    source_get_weak_source,
    source_get_name,
    get_source_by_name,
    weak_source_addref: weak_noop,
    weak_source_release: weak_noop,
    weak_source_expired: weak_expired,
    weak_source_get_source: weak_get_source,
    weak_source_references_source: weak_references,
};
