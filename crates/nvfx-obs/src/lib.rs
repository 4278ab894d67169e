#![doc = include_str!("../README.md")]

pub mod graphics;
pub mod source;
pub mod sys;
pub mod texture;


pub use graphics::GraphicsGuard;
pub use source::{Source, WeakSource};
pub use sys::ObsApi;
pub use texture::Texture;
