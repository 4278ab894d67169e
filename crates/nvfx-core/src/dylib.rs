//! Runtime loading of vendor and host shared libraries.
//!
//! Vendor SDKs are installed separately from the plugin and may be absent,
//! so nothing links against them at build time.  Libraries are resolved on
//! first use and stay loaded for the process lifetime: function tables built
//! from them live in `OnceLock` statics and are never torn down.

use std::ffi::{CStr, CString, OsStr, c_char, c_void};
use std::path::Path;

use tracing::debug;

use crate::error::{FxError, Result};

#[cfg(unix)]
unsafe extern "C" {
    fn dlopen(filename: *const c_char, flags: i32) -> *mut c_void;
    fn dlerror() -> *const c_char;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
}

#[cfg(unix)]
const RTLD_NOW: i32 = 2;
#[cfg(all(unix, not(target_os = "macos")))]
const RTLD_GLOBAL: i32 = 0x100;
#[cfg(target_os = "macos")]
const RTLD_GLOBAL: i32 = 0x8;

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut c_void;
    fn GetProcAddress(module: *mut c_void, name: *const c_char) -> *mut c_void;
    fn GetLastError() -> u32;
}

/// A loaded shared library.
#[derive(Debug)]
pub struct Library {
    handle: *mut c_void,
    path: String,
}

// SAFETY: the handle is an immutable loader token; symbol lookup is
// thread-safe on every supported platform.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

#[cfg(unix)]
fn last_loader_error(fallback: &str) -> String {
    // SAFETY: dlerror returns a thread-local C string or null.
    unsafe {
        let p = dlerror();
        if p.is_null() {
            fallback.to_string()
        } else {
            CStr::from_ptr(p).to_string_lossy().to_string()
        }
    }
}

#[cfg(windows)]
fn last_loader_error(_fallback: &str) -> String {
    // SAFETY: GetLastError has no preconditions.
    let code = unsafe { GetLastError() };
    format!("win32 error {code}")
}

impl Library {
    /// Open a single library by path or loader-resolved name.
    pub fn open(name: impl AsRef<OsStr>) -> Result<Self> {
        let name = name.as_ref();
        let shown = name.to_string_lossy().into_owned();
        let handle = Self::open_raw(name)
            .map_err(|err| FxError::LibraryLoad(format!("{shown}: {err}")))?;
        debug!(library = %shown, "Shared library loaded");
        Ok(Self {
            handle,
            path: shown,
        })
    }

    /// Open the first candidate that loads, in order.
    pub fn open_first<I, P>(candidates: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<OsStr>,
    {
        let mut tried = Vec::new();
        for candidate in candidates {
            match Self::open(candidate.as_ref()) {
                Ok(lib) => return Ok(lib),
                Err(err) => tried.push(err.to_string()),
            }
        }
        if tried.is_empty() {
            return Err(FxError::LibraryLoad("no library candidates given".into()));
        }
        Err(FxError::LibraryLoad(tried.join("; ")))
    }

    #[cfg(unix)]
    fn open_raw(name: &OsStr) -> std::result::Result<*mut c_void, String> {
        use std::os::unix::ffi::OsStrExt;
        let cname =
            CString::new(name.as_bytes()).map_err(|_| "library name contains NUL".to_string())?;
        // SAFETY: cname is a valid NUL-terminated path and the flags are valid.
        let handle = unsafe { dlopen(cname.as_ptr(), RTLD_NOW | RTLD_GLOBAL) };
        if handle.is_null() {
            Err(last_loader_error("unknown dlopen error"))
        } else {
            Ok(handle)
        }
    }

    #[cfg(windows)]
    fn open_raw(name: &OsStr) -> std::result::Result<*mut c_void, String> {
        use std::os::windows::ffi::OsStrExt;
        let wide: Vec<u16> = name.encode_wide().chain(std::iter::once(0)).collect();
        // SAFETY: wide is a valid NUL-terminated UTF-16 string.
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            Err(last_loader_error("unknown LoadLibrary error"))
        } else {
            Ok(handle)
        }
    }

    /// Path or name the library was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn raw_symbol(&self, name: &str) -> Option<*mut c_void> {
        let cname = CString::new(name).ok()?;
        #[cfg(unix)]
        // SAFETY: handle comes from dlopen and cname is NUL-terminated.
        let ptr = unsafe { dlsym(self.handle, cname.as_ptr()) };
        #[cfg(windows)]
        // SAFETY: handle comes from LoadLibraryW and cname is NUL-terminated.
        let ptr = unsafe { GetProcAddress(self.handle, cname.as_ptr()) };
        (!ptr.is_null()).then_some(ptr)
    }

    /// Resolve a required function symbol.
    ///
    /// # Safety
    /// `T` must be a function pointer type matching the symbol's C signature.
    pub unsafe fn symbol<T: Copy>(&self, name: &'static str) -> Result<T> {
        match self.raw_symbol(name) {
            // SAFETY: caller guarantees T is the symbol's function pointer type.
            Some(ptr) => Ok(unsafe { std::mem::transmute_copy(&ptr) }),
            None => Err(FxError::LibraryLoad(format!(
                "symbol {name} not found in {}: {}",
                self.path,
                last_loader_error("symbol missing")
            ))),
        }
    }

    /// Resolve a symbol that only some library versions or platforms export.
    ///
    /// # Safety
    /// Same contract as [`Library::symbol`].
    pub unsafe fn optional_symbol<T: Copy>(&self, name: &'static str) -> Option<T> {
        self.raw_symbol(name)
            // SAFETY: caller guarantees T is the symbol's function pointer type.
            .map(|ptr| unsafe { std::mem::transmute_copy(&ptr) })
    }
}

/// Platform file name of a library: `foo` → `libfoo.so` / `foo.dll` / `libfoo.dylib`.
pub fn platform_file_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{stem}.dylib")
    } else {
        format!("lib{stem}.so")
    }
}

/// Candidate list: `dirs/<file>` for every directory, then the bare file
/// name so the platform loader search path is tried last.
pub fn candidates_in<'a>(dirs: impl IntoIterator<Item = &'a Path>, file: &str) -> Vec<String> {
    let mut out: Vec<String> = dirs
        .into_iter()
        .map(|dir| dir.join(file).to_string_lossy().to_string())
        .collect();
    out.push(file.to_string());
    out
}
