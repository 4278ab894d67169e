//! In-process stand-in for the feature SDK used by unit tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_ulong, c_void};

use nvfx_core::ffi_types::CUstream;

use crate::sys::{ArApi, NvArHandle};

pub const REJECTED_KEY: &str = "NvAR_Parameter_Config_Unsupported";

thread_local! {
    static LIVE: Cell<i32> = const { Cell::new(0) };
    static LAST_ARRAY_LEN: Cell<i32> = const { Cell::new(-1) };
    static LAST_OBJECT_SIZE: Cell<u64> = const { Cell::new(0) };
    static NEXT_RUN_STATUS: Cell<i32> = const { Cell::new(0) };
}

pub fn live_handles() -> i32 {
    LIVE.with(Cell::get)
}

pub fn last_array_len() -> i32 {
    LAST_ARRAY_LEN.with(Cell::get)
}

pub fn last_object_size() -> u64 {
    LAST_OBJECT_SIZE.with(Cell::get)
}

pub fn fail_next_run(status: i32) {
    NEXT_RUN_STATUS.with(|s| s.set(status));
}

#[derive(Default)]
struct FakeFeature {
    u32s: HashMap<String, u32>,
    f32s: HashMap<String, f32>,
    strings: HashMap<String, CString>,
}

fn feature<'a>(handle: NvArHandle) -> &'a mut FakeFeature {
    // SAFETY: handles are boxed FakeFeature values created below.
    unsafe { &mut *handle.cast::<FakeFeature>() }
}

fn key(name: *const c_char) -> String {
    // SAFETY: the wrapper always passes NUL-terminated keys.
    unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
}

fn accept(name: *const c_char) -> i32 {
    if key(name) == REJECTED_KEY { -7 } else { 0 }
}

unsafe extern "C" fn create(id: *const c_char, out: *mut NvArHandle) -> i32 {
    if key(id) != "FaceDetection" {
        return -14;
    }
    LIVE.with(|c| c.set(c.get() + 1));
    unsafe { *out = Box::into_raw(Box::<FakeFeature>::default()).cast() };
    0
}

unsafe extern "C" fn destroy(handle: NvArHandle) -> i32 {
    LIVE.with(|c| c.set(c.get() - 1));
    drop(unsafe { Box::from_raw(handle.cast::<FakeFeature>()) });
    0
}

unsafe extern "C" fn load(_handle: NvArHandle) -> i32 {
    0
}

unsafe extern "C" fn run(_handle: NvArHandle) -> i32 {
    NEXT_RUN_STATUS.with(|s| s.replace(0))
}

unsafe extern "C" fn set_u32(handle: NvArHandle, name: *const c_char, value: u32) -> i32 {
    let status = accept(name);
    if status == 0 {
        feature(handle).u32s.insert(key(name), value);
    }
    status
}

unsafe extern "C" fn set_f32(handle: NvArHandle, name: *const c_char, value: f32) -> i32 {
    let status = accept(name);
    if status == 0 {
        feature(handle).f32s.insert(key(name), value);
    }
    status
}

unsafe extern "C" fn set_string(
    handle: NvArHandle,
    name: *const c_char,
    value: *const c_char,
) -> i32 {
    let status = accept(name);
    if status == 0 {
        let value = unsafe { CStr::from_ptr(value) }.to_owned();
        feature(handle).strings.insert(key(name), value);
    }
    status
}

unsafe extern "C" fn set_cuda_stream(
    _handle: NvArHandle,
    name: *const c_char,
    _stream: CUstream,
) -> i32 {
    accept(name)
}

unsafe extern "C" fn set_object(
    _handle: NvArHandle,
    name: *const c_char,
    _ptr: *mut c_void,
    size: c_ulong,
) -> i32 {
    LAST_OBJECT_SIZE.with(|c| c.set(u64::from(size)));
    accept(name)
}

unsafe extern "C" fn set_f32_array(
    _handle: NvArHandle,
    name: *const c_char,
    _ptr: *mut f32,
    count: i32,
) -> i32 {
    LAST_ARRAY_LEN.with(|c| c.set(count));
    accept(name)
}

unsafe extern "C" fn get_u32(handle: NvArHandle, name: *const c_char, out: *mut u32) -> i32 {
    match feature(handle).u32s.get(&key(name)) {
        Some(v) => {
            unsafe { *out = *v };
            0
        }
        None => -7,
    }
}

unsafe extern "C" fn get_f32(handle: NvArHandle, name: *const c_char, out: *mut f32) -> i32 {
    match feature(handle).f32s.get(&key(name)) {
        Some(v) => {
            unsafe { *out = *v };
            0
        }
        None => -7,
    }
}

unsafe extern "C" fn get_string(
    handle: NvArHandle,
    name: *const c_char,
    out: *mut *const c_char,
) -> i32 {
    match feature(handle).strings.get(&key(name)) {
        Some(v) => {
            unsafe { *out = v.as_ptr() };
            0
        }
        None => -7,
    }
}

pub static FAKE_API: ArApi = ArApi {
    create,
    destroy,
    load,
    run,
    set_u32,
    set_f32,
    set_string,
    set_cuda_stream,
    set_object,
    set_f32_array,
    get_u32,
    get_f32,
    get_string,
};
