#![doc = include_str!("../README.md")]

pub mod image;
pub mod sys;
pub mod texture;
pub mod transfer;

pub use image::Image;
pub use sys::{CvApi, NvCVImage};
pub use texture::{MappedResource, TextureImage};
pub use transfer::{RawImage, transfer};

#[cfg(test)]
pub(crate) mod fake;
