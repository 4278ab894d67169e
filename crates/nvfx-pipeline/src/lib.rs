#![doc = include_str!("../README.md")]

pub mod config;
pub mod facedetection;

pub use config::{CONFIG_SCHEMA_VERSION, FaceDetectionConfig};
pub use facedetection::{FaceDetection, GraphState, MAX_TRACKED_FACES, TrackedFace};
