//! Result layouts shared with the SDK by pointer.

use std::ptr;

/// Axis-aligned box in input-image pixels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Caller-owned view the SDK writes detections into.
///
/// `rects` points at `maximum` elements; the SDK sets `current` on every
/// run.
#[repr(C)]
#[derive(Debug)]
pub struct BoundingBoxes {
    pub rects: *mut Rect,
    pub current: u8,
    pub maximum: u8,
}

impl Default for BoundingBoxes {
    fn default() -> Self {
        Self {
            rects: ptr::null_mut(),
            current: 0,
            maximum: 0,
        }
    }
}
