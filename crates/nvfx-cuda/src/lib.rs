#![doc = include_str!("../README.md")]

pub mod context;

pub use context::{ContextGuard, CudaRuntime};
