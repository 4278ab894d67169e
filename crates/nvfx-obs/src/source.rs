//! Strong and weak references to host sources.
//!
//! `Clone` adds a reference, `Drop` releases one and moves transfer the
//! reference without touching the count.  Comparison is by handle address.

use std::cmp::Ordering;
use std::ffi::{CStr, CString};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;

use nvfx_core::error::{FxError, Result};

use crate::sys::{ObsApi, obs_source_t, obs_weak_source_t};

/// Strong reference to a host source.
pub struct Source {
    api: &'static ObsApi,
    ptr: NonNull<obs_source_t>,
}

impl Source {
    /// Take over a reference the caller already owns.
    ///
    /// # Safety
    /// `raw` must carry one strong reference that the caller gives up.
    pub unsafe fn from_raw_owned(api: &'static ObsApi, raw: *mut obs_source_t) -> Result<Self> {
        let ptr =
            NonNull::new(raw).ok_or_else(|| FxError::InvalidArgument("null source".into()))?;
        Ok(Self { api, ptr })
    }

    /// Add a reference to a source the caller does not own.
    ///
    /// # Safety
    /// `raw` must be a valid source handle for the duration of the call.
    pub unsafe fn from_raw_borrowed(api: &'static ObsApi, raw: *mut obs_source_t) -> Result<Self> {
        if raw.is_null() {
            return Err(FxError::InvalidArgument("null source".into()));
        }
        // SAFETY: raw is a valid source handle per the caller contract.
        let acquired = unsafe { (api.source_get_ref)(raw) };
        let ptr = NonNull::new(acquired)
            .ok_or_else(|| FxError::Host("source is being destroyed".into()))?;
        Ok(Self { api, ptr })
    }

    /// Look up a source by its user-visible name.
    pub fn by_name(api: &'static ObsApi, name: &str) -> Result<Option<Self>> {
        let cname = CString::new(name)
            .map_err(|_| FxError::InvalidArgument(format!("source name {name:?} contains NUL")))?;
        // SAFETY: cname is NUL-terminated; the host returns a new reference or null.
        let raw = unsafe { (api.get_source_by_name)(cname.as_ptr()) };
        Ok(NonNull::new(raw).map(|ptr| Self { api, ptr }))
    }

    pub fn as_ptr(&self) -> *mut obs_source_t {
        self.ptr.as_ptr()
    }

    pub fn name(&self) -> String {
        // SAFETY: we hold a reference, so the source and its name are live.
        let raw = unsafe { (self.api.source_get_name)(self.ptr.as_ptr()) };
        if raw.is_null() {
            return String::new();
        }
        // SAFETY: the host returns a NUL-terminated string.
        unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
    }

    pub fn downgrade(&self) -> Result<WeakSource> {
        // SAFETY: we hold a reference; the host returns a new weak reference.
        let raw = unsafe { (self.api.source_get_weak_source)(self.ptr.as_ptr()) };
        let ptr = NonNull::new(raw)
            .ok_or_else(|| FxError::Host("source has no weak reference".into()))?;
        Ok(WeakSource { api: self.api, ptr })
    }
}

impl Clone for Source {
    fn clone(&self) -> Self {
        // SAFETY: we hold a reference, so the source cannot be mid-destruction.
        unsafe { (self.api.source_get_ref)(self.ptr.as_ptr()) };
        Self {
            api: self.api,
            ptr: self.ptr,
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        // SAFETY: releases the reference this value owns.
        unsafe { (self.api.source_release)(self.ptr.as_ptr()) };
    }
}

/// Weak reference to a host source.
pub struct WeakSource {
    api: &'static ObsApi,
    ptr: NonNull<obs_weak_source_t>,
}

impl WeakSource {
    /// Add a weak reference to a handle the caller does not own.
    ///
    /// # Safety
    /// `raw` must be a valid weak source handle for the duration of the call.
    pub unsafe fn from_raw_borrowed(
        api: &'static ObsApi,
        raw: *mut obs_weak_source_t,
    ) -> Result<Self> {
        let ptr = NonNull::new(raw)
            .ok_or_else(|| FxError::InvalidArgument("null weak source".into()))?;
        // SAFETY: raw is valid per the caller contract.
        unsafe { (api.weak_source_addref)(raw) };
        Ok(Self { api, ptr })
    }

    pub fn as_ptr(&self) -> *mut obs_weak_source_t {
        self.ptr.as_ptr()
    }

    /// Whether the source has been destroyed.
    pub fn expired(&self) -> bool {
        // SAFETY: we hold a weak reference.
        unsafe { (self.api.weak_source_expired)(self.ptr.as_ptr()) }
    }

    /// Strong reference, if the source is still alive.
    pub fn lock(&self) -> Option<Source> {
        // SAFETY: we hold a weak reference; the host returns a new strong
        // reference or null.
        let raw = unsafe { (self.api.weak_source_get_source)(self.ptr.as_ptr()) };
        NonNull::new(raw).map(|ptr| Source { api: self.api, ptr })
    }

    /// Whether this weak reference points at `source`.
    pub fn references(&self, source: &Source) -> bool {
        // SAFETY: both handles are referenced by their wrappers.
        unsafe { (self.api.weak_source_references_source)(self.ptr.as_ptr(), source.as_ptr()) }
    }
}

impl Clone for WeakSource {
    fn clone(&self) -> Self {
        // SAFETY: we hold a weak reference.
        unsafe { (self.api.weak_source_addref)(self.ptr.as_ptr()) };
        Self {
            api: self.api,
            ptr: self.ptr,
        }
    }
}

impl Drop for WeakSource {
    fn drop(&mut self) {
        // SAFETY: releases the weak reference this value owns.
        unsafe { (self.api.weak_source_release)(self.ptr.as_ptr()) };
    }
}

macro_rules! handle_identity {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.ptr == other.ptr
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.ptr.as_ptr().cmp(&other.ptr.as_ptr())
            }
        }

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.ptr.hash(state);
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($ty)).field(&self.ptr).finish()
            }
        }
    };
}

handle_identity!(Source);
handle_identity!(WeakSource);
