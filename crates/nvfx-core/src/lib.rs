#![doc = include_str!("../README.md")]

pub mod dylib;
pub mod error;
pub mod ffi_types;
pub mod runtime;
pub mod types;

pub use error::{FxError, NvCvStatus, Result};
