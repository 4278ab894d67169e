#![doc = include_str!("../README.md")]

pub mod feature;
pub mod params;
pub mod sys;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use feature::Feature;
pub use sys::ArApi;
pub use types::{BoundingBoxes, Rect};
