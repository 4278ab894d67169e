//! Face detection over host frames.
//!
//! Each [`FaceDetection::process`] call copies the frame into a
//! texture-backed input image, converts it to the detector's BGR input and
//! runs the feature graph.  Results are written by the graph straight into
//! buffers owned here, bound to it by address:
//!
//! - `bboxes`, a boxed [`BoundingBoxes`] header pointing into `rects`,
//! - `confidence`, one score per rectangle.
//!
//! Both vectors are allocated with `MAX_TRACKED_FACES` capacity and only
//! shrink or grow within it.  Every operation that changes a bound buffer
//! re-binds it before returning.

use std::mem::{ManuallyDrop, size_of};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use nvfx_ar::params::{FEATURE_FACE_DETECTION, config, input, output};
use nvfx_ar::types::{BoundingBoxes, Rect};
use nvfx_core::error::{FxError, Result};
use nvfx_core::ffi_types::CUstream;
use nvfx_core::runtime::{FeatureGraph, GpuImage, HostTexture, VisionRuntime};
use nvfx_core::types::{ComponentLayout, ComponentType, ImageDesc, MemoryLocation, PixelFormat};

use crate::config::FaceDetectionConfig;

/// Upper bound the detector supports for simultaneously tracked faces.
pub const MAX_TRACKED_FACES: usize = 8;

/// Whether the feature graph reflects the current configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphState {
    /// Parameters or resources changed since the last load.
    Dirty,
    /// Loaded with the current parameters; safe to run.
    Clean,
}

/// One detection from the most recent frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedFace {
    pub rect: Rect,
    pub confidence: f32,
}

fn source_desc(width: u32, height: u32) -> ImageDesc {
    ImageDesc::new(
        width,
        height,
        PixelFormat::Bgr,
        ComponentType::U8,
        ComponentLayout::Interleaved,
        MemoryLocation::Gpu,
    )
}

fn scratch_desc(width: u32, height: u32) -> ImageDesc {
    ImageDesc::new(
        width,
        height,
        PixelFormat::Rgba,
        ComponentType::U8,
        ComponentLayout::Planar,
        MemoryLocation::Gpu,
    )
}

/// Face-detection pipeline for one effect instance.
pub struct FaceDetection<R: VisionRuntime> {
    runtime: Arc<R>,
    // Destroyed explicitly in `Drop`, before the buffers it points into.
    feature: ManuallyDrop<R::Graph>,
    input: Option<R::InputImage>,
    source: Option<R::Image>,
    tmp: Option<R::Image>,
    rects: Vec<Rect>,
    confidence: Vec<f32>,
    bboxes: Box<BoundingBoxes>,
    // Stream handle last bound to the graph.
    bound_stream: CUstream,
    state: GraphState,
}

impl<R: VisionRuntime> FaceDetection<R> {
    /// Create the detector tracking a single face.
    ///
    /// The graph is loaded once to validate the installation, but the
    /// pipeline stays [`GraphState::Dirty`] until the first frame binds an
    /// input image.
    pub fn new(runtime: Arc<R>) -> Result<Self> {
        Self::build(runtime, None)
    }

    /// Create the detector from a validated configuration document.
    pub fn with_config(runtime: Arc<R>, cfg: &FaceDetectionConfig) -> Result<Self> {
        cfg.validate()?;
        let mut this = Self::build(runtime, cfg.model_dir.as_deref())?;
        this.set_tracking_limit(cfg.tracking_limit)?;
        Ok(this)
    }

    fn build(runtime: Arc<R>, model_dir: Option<&Path>) -> Result<Self> {
        let _gfx = runtime.enter_graphics()?;
        let _cuda = runtime.enter_compute()?;

        let mut feature = runtime.create_feature(FEATURE_FACE_DETECTION)?;
        let stream = runtime.cuda_stream()?;
        feature.set_cuda_stream(config::CUDA_STREAM, stream)?;
        if let Some(dir) = model_dir {
            feature.set_string(config::MODEL_DIR, &dir.to_string_lossy())?;
        }

        let mut this = Self {
            runtime,
            feature: ManuallyDrop::new(feature),
            input: None,
            source: None,
            tmp: None,
            rects: Vec::with_capacity(MAX_TRACKED_FACES),
            confidence: Vec::with_capacity(MAX_TRACKED_FACES),
            bboxes: Box::default(),
            bound_stream: stream,
            state: GraphState::Dirty,
        };
        this.set_tracking_limit(1)?;
        this.feature.load()?;
        debug!("Face detection initialized");
        Ok(this)
    }

    pub const fn tracking_limit_range() -> (usize, usize) {
        (1, MAX_TRACKED_FACES)
    }

    pub fn tracking_limit(&self) -> usize {
        self.rects.len()
    }

    /// Change how many faces the graph reports, clamped to
    /// [`Self::tracking_limit_range`].
    ///
    /// Temporal filtering is only enabled when tracking a single face.
    /// Always marks the graph dirty.  If the confidence buffer cannot be
    /// bound, the previous limit stays in effect.
    pub fn set_tracking_limit(&mut self, limit: usize) -> Result<()> {
        let limit = limit.clamp(1, MAX_TRACKED_FACES);
        let previous = self.rects.len();
        self.state = GraphState::Dirty;

        self.rects.resize(limit, Rect::default());
        self.confidence.resize(limit, 0.0);

        // SAFETY: the arrays never exceed their reserved capacity, so the
        // bound address is stable until the next call re-binds it.
        let bound = unsafe {
            self.feature.set_f32_array(
                output::BOUNDING_BOXES_CONFIDENCE,
                self.confidence.as_mut_ptr(),
                limit,
            )
        };
        if let Err(err) = bound {
            self.rects.truncate(previous);
            self.confidence.truncate(previous);
            return Err(err);
        }

        self.bboxes.rects = self.rects.as_mut_ptr();
        self.bboxes.maximum = limit as u8;
        self.bboxes.current = 0;

        let bboxes: *mut BoundingBoxes = &mut *self.bboxes;
        // SAFETY: the header is boxed and points into reserved capacity.
        unsafe {
            self.feature.set_object(
                output::BOUNDING_BOXES,
                bboxes.cast(),
                size_of::<BoundingBoxes>(),
            )?;
        }
        self.feature.set_u32(config::TEMPORAL, u32::from(limit == 1))?;

        debug!(limit, "Tracking limit changed");
        Ok(())
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn feature(&self) -> &R::Graph {
        &self.feature
    }

    pub fn bounding_boxes(&self) -> &BoundingBoxes {
        &self.bboxes
    }

    /// Detect faces in `frame`.
    ///
    /// Holds the graphics context, then the compute context, for the whole
    /// call.  Resources follow the frame size; a dirty graph, or one bound
    /// to a stream that has since been replaced, is reloaded before it runs.
    pub fn process(&mut self, frame: &R::Frame) -> Result<()> {
        let _gfx = self.runtime.enter_graphics()?;
        let _cuda = self.runtime.enter_compute()?;

        if self.runtime.cuda_stream()? != self.bound_stream {
            debug!("Compute stream replaced, rebinding");
            self.state = GraphState::Dirty;
        }

        self.resize(frame.width(), frame.height())?;
        if self.state == GraphState::Dirty {
            self.load()?;
        }

        let (Some(input), Some(source), Some(tmp)) =
            (self.input.as_mut(), self.source.as_mut(), self.tmp.as_mut())
        else {
            return Err(FxError::InvariantViolation(
                "face detection resources missing after resize".into(),
            ));
        };

        self.runtime.copy_frame(input, frame)?;

        if let Err(err) = self.runtime.convert(input, source, tmp) {
            match err.status() {
                Some(status) => error!(
                    status = %status,
                    reason = %self.runtime.status_string(status),
                    "Failed to transfer input to processing source"
                ),
                None => error!(error = %err, "Failed to transfer input to processing source"),
            }
            return Err(err);
        }

        self.run()
    }

    fn run(&mut self) -> Result<()> {
        if self.state == GraphState::Dirty {
            return Err(FxError::InvariantViolation(
                "face detection graph run before reload".into(),
            ));
        }
        self.feature.run()?;

        let (current, maximum) = (self.bboxes.current, self.bboxes.maximum);
        if current > maximum {
            self.bboxes.current = 0;
            return Err(FxError::InvariantViolation(format!(
                "graph reported {current} faces for a buffer of {maximum}"
            )));
        }
        Ok(())
    }

    /// Bring the input, source and scratch images to `width` x `height`.
    ///
    /// No-op when the size is unchanged.  Reallocation marks the graph
    /// dirty; a new source image is re-bound as the graph input.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let _gfx = self.runtime.enter_graphics()?;
        let _cuda = self.runtime.enter_compute()?;

        if self.tmp.is_none() {
            self.tmp = Some(self.runtime.create_image(&scratch_desc(width, height))?);
        }

        let input_stale = self
            .input
            .as_ref()
            .is_none_or(|img| img.width() != width || img.height() != height);
        if input_stale {
            match self.input.as_mut() {
                Some(img) => img.resize(width, height)?,
                None => self.input = Some(self.runtime.create_input_image(width, height)?),
            }
            self.state = GraphState::Dirty;
        }

        let source_stale = self
            .source
            .as_ref()
            .is_none_or(|img| img.width() != width || img.height() != height);
        if source_stale {
            match self.source.as_mut() {
                Some(img) => img.resize(width, height)?,
                None => self.source = Some(self.runtime.create_image(&source_desc(width, height))?),
            }
            self.state = GraphState::Dirty;

            if let Some(source) = self.source.as_mut() {
                let (ptr, size) = source.as_object();
                // SAFETY: the image header keeps its address for the image's
                // lifetime and is re-bound whenever it is reallocated.
                unsafe { self.feature.set_object(input::IMAGE, ptr, size)? };
            }
            debug!(width, height, "Face detection resources resized");
        }
        Ok(())
    }

    /// Re-bind the compute stream and reload the graph.
    pub fn load(&mut self) -> Result<()> {
        let _gfx = self.runtime.enter_graphics()?;
        let _cuda = self.runtime.enter_compute()?;

        let stream = self.runtime.cuda_stream()?;
        self.feature.set_cuda_stream(config::CUDA_STREAM, stream)?;
        self.bound_stream = stream;
        self.feature.load()?;
        self.state = GraphState::Clean;
        Ok(())
    }

    /// Faces found by the most recent [`Self::process`].
    pub fn count(&self) -> usize {
        usize::from(self.bboxes.current)
    }

    pub fn at(&self, index: usize) -> Result<&Rect> {
        self.at_with_confidence(index).map(|(rect, _)| rect)
    }

    pub fn at_with_confidence(&self, index: usize) -> Result<(&Rect, f32)> {
        let count = self.count();
        if count == 0 {
            return Err(FxError::NoResults);
        }
        if index >= count {
            return Err(FxError::IndexOutOfRange { index, count });
        }
        match (self.rects.get(index), self.confidence.get(index)) {
            (Some(rect), Some(confidence)) => Ok((rect, *confidence)),
            _ => Err(FxError::IndexOutOfRange { index, count }),
        }
    }

    /// Detections of the most recent frame, in graph output order.
    pub fn faces(&self) -> impl Iterator<Item = TrackedFace> + '_ {
        self.rects
            .iter()
            .zip(&self.confidence)
            .take(self.count())
            .map(|(rect, confidence)| TrackedFace {
                rect: *rect,
                confidence: *confidence,
            })
    }
}

impl<R: VisionRuntime> Drop for FaceDetection<R> {
    fn drop(&mut self) {
        let gfx = self.runtime.enter_graphics();
        let cuda = self.runtime.enter_compute();
        if gfx.is_err() || cuda.is_err() {
            warn!("Releasing face detection resources outside the GPU contexts");
        }

        // SAFETY: the feature is never touched again.
        unsafe { ManuallyDrop::drop(&mut self.feature) };
        drop(self.input.take());
        drop(self.source.take());
        drop(self.tmp.take());

        drop(cuda);
        drop(gfx);
        debug!("Face detection finalized");
    }
}
