//! Seam traits between effect pipelines and the GPU stack.
//!
//! Pipelines are written against [`VisionRuntime`] and never touch vendor
//! handles directly.  The NVIDIA composition lives in `nvfx-runtime-nvidia`;
//! tests substitute an in-memory runtime.

use std::ffi::c_void;

use crate::error::{NvCvStatus, Result};
use crate::ffi_types::CUstream;
use crate::types::ImageDesc;

/// A host graphics texture handed to an effect for one frame.
pub trait HostTexture {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// A GPU image that can be bound to a feature graph.
pub trait GpuImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reallocate the pixel storage for new dimensions, keeping the format.
    ///
    /// The vendor image header keeps its address, but its pixel pointer
    /// changes: any graph binding of this image must be refreshed.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Address and size of the vendor image header, for
    /// [`FeatureGraph::set_object`].
    fn as_object(&mut self) -> (*mut c_void, usize);
}

/// A loadable vendor feature graph with string-keyed parameters.
///
/// Every non-success vendor status surfaces as an error naming the
/// parameter or operation.
pub trait FeatureGraph {
    fn set_u32(&mut self, key: &str, value: u32) -> Result<()>;
    fn set_f32(&mut self, key: &str, value: f32) -> Result<()>;
    fn set_string(&mut self, key: &str, value: &str) -> Result<()>;
    fn set_cuda_stream(&mut self, key: &str, stream: CUstream) -> Result<()>;

    /// Bind a raw memory object by address.
    ///
    /// # Safety
    /// `ptr` must point to `size` valid bytes that stay at the same address
    /// until the key is re-bound or the graph is dropped.
    unsafe fn set_object(&mut self, key: &str, ptr: *mut c_void, size: usize) -> Result<()>;

    /// Bind a caller-owned `f32` array the graph writes into.
    ///
    /// # Safety
    /// `ptr` must point to `len` writable floats with the same pinning
    /// contract as [`FeatureGraph::set_object`].
    unsafe fn set_f32_array(&mut self, key: &str, ptr: *mut f32, len: usize) -> Result<()>;

    fn get_u32(&self, key: &str) -> Result<u32>;
    fn get_f32(&self, key: &str) -> Result<f32>;

    /// Compile and allocate graph resources for the current parameters.
    fn load(&mut self) -> Result<()>;

    /// Execute one pass over the bound input.
    fn run(&mut self) -> Result<()>;
}

/// The GPU stack an effect pipeline runs on.
///
/// Guards are released on drop.  Callers acquire the graphics guard before
/// the compute guard and drop them in reverse order.
pub trait VisionRuntime {
    /// Host graphics context held for the guard's lifetime.
    type GraphicsGuard;
    /// Compute context made current for the guard's lifetime.
    type ComputeGuard;
    /// Frame texture supplied by the host.
    type Frame: HostTexture;
    /// Image backed by a host texture, same format as `Frame`.
    type InputImage: GpuImage;
    /// Device-resident vendor image.
    type Image: GpuImage;
    type Graph: FeatureGraph;

    fn enter_graphics(&self) -> Result<Self::GraphicsGuard>;
    fn enter_compute(&self) -> Result<Self::ComputeGuard>;

    /// Current compute stream.  May change between calls if the stream is
    /// recreated, so graphs re-bind it before every load.
    fn cuda_stream(&self) -> Result<CUstream>;

    fn create_feature(&self, feature_id: &str) -> Result<Self::Graph>;
    fn create_image(&self, desc: &ImageDesc) -> Result<Self::Image>;
    fn create_input_image(&self, width: u32, height: u32) -> Result<Self::InputImage>;

    /// GPU blit of the host frame into the input image.
    fn copy_frame(&self, dst: &mut Self::InputImage, frame: &Self::Frame) -> Result<()>;

    /// Convert `src` into the pixel format of `dst`, using `tmp` as
    /// workspace.
    fn convert(
        &self,
        src: &mut Self::InputImage,
        dst: &mut Self::Image,
        tmp: &mut Self::Image,
    ) -> Result<()>;

    /// Human-readable vendor description of a status code.
    fn status_string(&self, status: NvCvStatus) -> String {
        status.name().to_string()
    }
}
