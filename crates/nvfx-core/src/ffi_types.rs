//! Opaque FFI handle aliases shared across crate boundaries.
//!
//! Crates that talk to different vendor libraries exchange CUDA handles as
//! these untyped pointers, so none of them has to depend on another crate's
//! bindings.

use std::ffi::c_void;

/// Raw CUDA stream handle (`CUstream`).
pub type CUstream = *mut c_void;

/// Raw CUDA context handle (`CUcontext`).
pub type CUcontext = *mut c_void;

/// Result code of the CUDA driver API (`CUresult`).
pub type CUresult = i32;

pub const CUDA_SUCCESS: CUresult = 0;
