//! In-memory `VisionRuntime` that records what a pipeline asks of it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Arc, Mutex, MutexGuard};

use nvfx_ar::params::{FEATURE_FACE_DETECTION, output};
use nvfx_ar::types::{BoundingBoxes, Rect};
use nvfx_core::error::{FxError, NvCvStatus, Result};
use nvfx_core::ffi_types::CUstream;
use nvfx_core::runtime::{FeatureGraph, GpuImage, HostTexture, VisionRuntime};
use nvfx_core::types::{ImageDesc, PixelFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    GraphicsEnter,
    GraphicsExit,
    ComputeEnter,
    ComputeExit,
}

#[derive(Default)]
pub struct Journal {
    pub events: Vec<Event>,
    pub graphics_depth: i32,
    pub compute_depth: i32,

    pub features_created: usize,
    pub features_destroyed: usize,
    pub feature_destroyed_inside_contexts: bool,
    pub images_created: Vec<PixelFormat>,
    pub input_images_created: usize,
    pub image_resizes: usize,
    pub input_resizes: usize,
    pub live_images: i32,
    pub copies: usize,
    pub converts: usize,
    pub loads: usize,
    pub runs: usize,
    pub input_image_bindings: usize,

    pub stream: usize,
    pub reject_param: Option<String>,
    pub fail_convert: Option<NvCvStatus>,
    pub fail_run: Option<NvCvStatus>,
    /// Detections the next run writes, truncated to the bound maximum.
    pub detections: Vec<(Rect, f32)>,
    /// Count the next run reports regardless of the buffer size.
    pub overreport: Option<u8>,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

fn lock(journal: &SharedJournal) -> MutexGuard<'_, Journal> {
    journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MockGuard {
    journal: SharedJournal,
    graphics: bool,
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        let mut j = lock(&self.journal);
        if self.graphics {
            j.graphics_depth -= 1;
            j.events.push(Event::GraphicsExit);
        } else {
            j.compute_depth -= 1;
            j.events.push(Event::ComputeExit);
        }
    }
}

pub struct MockFrame {
    pub width: u32,
    pub height: u32,
}

impl MockFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl HostTexture for MockFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

pub struct MockImage {
    journal: SharedJournal,
    width: u32,
    height: u32,
    input: bool,
    header: Box<[u8; 64]>,
}

impl GpuImage for MockImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let mut j = lock(&self.journal);
        if self.input {
            j.input_resizes += 1;
        } else {
            j.image_resizes += 1;
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn as_object(&mut self) -> (*mut c_void, usize) {
        (self.header.as_mut_ptr().cast(), self.header.len())
    }
}

impl Drop for MockImage {
    fn drop(&mut self) {
        lock(&self.journal).live_images -= 1;
    }
}

pub struct MockGraph {
    journal: SharedJournal,
    pub u32s: HashMap<String, u32>,
    pub f32s: HashMap<String, f32>,
    pub strings: HashMap<String, String>,
    pub streams: HashMap<String, CUstream>,
    pub objects: HashMap<String, (*mut c_void, usize)>,
    pub arrays: HashMap<String, (*mut f32, usize)>,
}

impl MockGraph {
    fn check(&self, key: &str) -> Result<()> {
        if lock(&self.journal).reject_param.as_deref() == Some(key) {
            return Err(FxError::Binding {
                param: key.to_string(),
                status: NvCvStatus::ERR_PARAMETER,
            });
        }
        Ok(())
    }
}

impl FeatureGraph for MockGraph {
    fn set_u32(&mut self, key: &str, value: u32) -> Result<()> {
        self.check(key)?;
        self.u32s.insert(key.to_string(), value);
        Ok(())
    }

    fn set_f32(&mut self, key: &str, value: f32) -> Result<()> {
        self.check(key)?;
        self.f32s.insert(key.to_string(), value);
        Ok(())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.check(key)?;
        self.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_cuda_stream(&mut self, key: &str, stream: CUstream) -> Result<()> {
        self.check(key)?;
        self.streams.insert(key.to_string(), stream);
        Ok(())
    }

    unsafe fn set_object(&mut self, key: &str, ptr: *mut c_void, size: usize) -> Result<()> {
        self.check(key)?;
        if key == nvfx_ar::params::input::IMAGE {
            lock(&self.journal).input_image_bindings += 1;
        }
        self.objects.insert(key.to_string(), (ptr, size));
        Ok(())
    }

    unsafe fn set_f32_array(&mut self, key: &str, ptr: *mut f32, len: usize) -> Result<()> {
        self.check(key)?;
        self.arrays.insert(key.to_string(), (ptr, len));
        Ok(())
    }

    fn get_u32(&self, key: &str) -> Result<u32> {
        self.u32s.get(key).copied().ok_or(FxError::Binding {
            param: key.to_string(),
            status: NvCvStatus::ERR_PARAMETER,
        })
    }

    fn get_f32(&self, key: &str) -> Result<f32> {
        self.f32s.get(key).copied().ok_or(FxError::Binding {
            param: key.to_string(),
            status: NvCvStatus::ERR_PARAMETER,
        })
    }

    fn load(&mut self) -> Result<()> {
        lock(&self.journal).loads += 1;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let (detections, overreport) = {
            let mut j = lock(&self.journal);
            j.runs += 1;
            if let Some(status) = j.fail_run {
                return Err(FxError::Run { status });
            }
            (j.detections.clone(), j.overreport)
        };

        let Some(&(bboxes, _)) = self.objects.get(output::BOUNDING_BOXES) else {
            return Err(FxError::Run {
                status: NvCvStatus::ERR_MISSINGINPUT,
            });
        };
        let Some(&(confidence, confidence_len)) =
            self.arrays.get(output::BOUNDING_BOXES_CONFIDENCE)
        else {
            return Err(FxError::Run {
                status: NvCvStatus::ERR_MISSINGINPUT,
            });
        };

        // SAFETY: the pipeline keeps both bindings valid until re-bound.
        unsafe {
            let bboxes = &mut *bboxes.cast::<BoundingBoxes>();
            let n = detections
                .len()
                .min(usize::from(bboxes.maximum))
                .min(confidence_len);
            for (i, (rect, score)) in detections.iter().take(n).enumerate() {
                *bboxes.rects.add(i) = *rect;
                *confidence.add(i) = *score;
            }
            bboxes.current = overreport.unwrap_or(n as u8);
        }
        Ok(())
    }
}

impl Drop for MockGraph {
    fn drop(&mut self) {
        let mut j = lock(&self.journal);
        j.features_destroyed += 1;
        j.feature_destroyed_inside_contexts = j.graphics_depth > 0 && j.compute_depth > 0;
    }
}

pub struct MockRuntime {
    pub journal: SharedJournal,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        let journal = Journal {
            stream: 0x1000,
            ..Journal::default()
        };
        Arc::new(Self {
            journal: Arc::new(Mutex::new(journal)),
        })
    }

    pub fn journal(&self) -> MutexGuard<'_, Journal> {
        lock(&self.journal)
    }

    fn image(&self, width: u32, height: u32, input: bool) -> MockImage {
        lock(&self.journal).live_images += 1;
        MockImage {
            journal: self.journal.clone(),
            width,
            height,
            input,
            header: Box::new([0; 64]),
        }
    }
}

impl VisionRuntime for MockRuntime {
    type GraphicsGuard = MockGuard;
    type ComputeGuard = MockGuard;
    type Frame = MockFrame;
    type InputImage = MockImage;
    type Image = MockImage;
    type Graph = MockGraph;

    fn enter_graphics(&self) -> Result<MockGuard> {
        let mut j = lock(&self.journal);
        j.graphics_depth += 1;
        j.events.push(Event::GraphicsEnter);
        Ok(MockGuard {
            journal: self.journal.clone(),
            graphics: true,
        })
    }

    fn enter_compute(&self) -> Result<MockGuard> {
        let mut j = lock(&self.journal);
        j.compute_depth += 1;
        j.events.push(Event::ComputeEnter);
        Ok(MockGuard {
            journal: self.journal.clone(),
            graphics: false,
        })
    }

    fn cuda_stream(&self) -> Result<CUstream> {
        Ok(lock(&self.journal).stream as CUstream)
    }

    fn create_feature(&self, feature_id: &str) -> Result<MockGraph> {
        if feature_id != FEATURE_FACE_DETECTION {
            return Err(FxError::Vendor {
                operation: "NvAR_Create",
                status: NvCvStatus(-14),
            });
        }
        lock(&self.journal).features_created += 1;
        Ok(MockGraph {
            journal: self.journal.clone(),
            u32s: HashMap::new(),
            f32s: HashMap::new(),
            strings: HashMap::new(),
            streams: HashMap::new(),
            objects: HashMap::new(),
            arrays: HashMap::new(),
        })
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<MockImage> {
        lock(&self.journal).images_created.push(desc.format);
        Ok(self.image(desc.width, desc.height, false))
    }

    fn create_input_image(&self, width: u32, height: u32) -> Result<MockImage> {
        lock(&self.journal).input_images_created += 1;
        Ok(self.image(width, height, true))
    }

    fn copy_frame(&self, dst: &mut MockImage, frame: &MockFrame) -> Result<()> {
        assert_eq!((dst.width, dst.height), (frame.width, frame.height));
        lock(&self.journal).copies += 1;
        Ok(())
    }

    fn convert(&self, src: &mut MockImage, dst: &mut MockImage, _tmp: &mut MockImage) -> Result<()> {
        assert_eq!((src.width, src.height), (dst.width, dst.height));
        let mut j = lock(&self.journal);
        j.converts += 1;
        match j.fail_convert {
            Some(status) => Err(FxError::Transfer { status }),
            None => Ok(()),
        }
    }
}

pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Rect {
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Whether every exit matches the innermost open scope and compute scopes
/// only ever open inside a graphics scope.
pub fn properly_nested(events: &[Event]) -> bool {
    let mut stack = Vec::new();
    for event in events {
        match event {
            Event::GraphicsEnter => stack.push(Event::GraphicsEnter),
            Event::ComputeEnter => {
                if !stack.contains(&Event::GraphicsEnter) {
                    return false;
                }
                stack.push(Event::ComputeEnter);
            }
            Event::GraphicsExit => {
                if stack.pop() != Some(Event::GraphicsEnter) {
                    return false;
                }
            }
            Event::ComputeExit => {
                if stack.pop() != Some(Event::ComputeEnter) {
                    return false;
                }
            }
        }
    }
    stack.is_empty()
}
