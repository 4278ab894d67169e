#![doc = include_str!("../README.md")]

//! Concrete NVIDIA runtime composition.
//!
//! This crate owns the composition of the host graphics API, the CUDA
//! context, NvCVImage and NvAR so effect pipelines depend only on the
//! `VisionRuntime` seam in `nvfx-core`.

pub mod sdk;

use std::io::IsTerminal;
use std::sync::Arc;

use tracing::info;

use nvfx_ar::{ArApi, Feature};
use nvfx_core::error::{NvCvStatus, Result};
use nvfx_core::ffi_types::CUstream;
use nvfx_core::runtime::VisionRuntime;
use nvfx_core::types::ImageDesc;
use nvfx_cuda::{ContextGuard, CudaRuntime};
use nvfx_cv::{CvApi, Image, TextureImage};
use nvfx_obs::{GraphicsGuard, ObsApi, Texture};
use nvfx_pipeline::FaceDetectionConfig;

pub use sdk::SdkLocations;

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "NVFX_LOG";

/// Install a stderr subscriber filtered by [`LOG_ENV`] (default `info`).
///
/// Returns `false` when a global subscriber is already installed, which is
/// left untouched.
pub fn init_tracing() -> bool {
    let ansi_enabled = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(ansi_enabled)
        .try_init()
        .is_ok()
}

/// The GPU stack shared by every effect instance in the process.
pub struct NvidiaRuntime {
    obs: &'static ObsApi,
    cuda: CudaRuntime,
    cv: &'static CvApi,
    ar: &'static ArApi,
}

impl NvidiaRuntime {
    /// Resolve the host API, load both vendor libraries and retain the
    /// CUDA device.
    pub fn new(device_ordinal: usize, locations: &SdkLocations) -> Result<Self> {
        let obs = nvfx_obs::sys::api()?;
        let cv = nvfx_cv::sys::load(locations.cv_candidates())?;
        let ar = nvfx_ar::sys::load(locations.ar_candidates())?;
        let cuda = CudaRuntime::new(device_ordinal)?;
        info!(
            device = device_ordinal,
            texture_interop = cv.supports_texture_interop(),
            "NVIDIA vision runtime ready"
        );
        Ok(Self { obs, cuda, cv, ar })
    }

    /// Build the runtime described by `cfg`, searching the SDK directories
    /// it names before the environment and default locations.
    pub fn from_config(cfg: &FaceDetectionConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        let locations = SdkLocations::from_env(cfg);
        Ok(Arc::new(Self::new(cfg.device_ordinal, &locations)?))
    }

    pub fn cuda(&self) -> &CudaRuntime {
        &self.cuda
    }

    pub fn cv_api(&self) -> &'static CvApi {
        self.cv
    }
}

impl VisionRuntime for NvidiaRuntime {
    type GraphicsGuard = GraphicsGuard;
    type ComputeGuard = ContextGuard;
    type Frame = Texture;
    type InputImage = TextureImage;
    type Image = Image;
    type Graph = Feature;

    fn enter_graphics(&self) -> Result<GraphicsGuard> {
        Ok(GraphicsGuard::enter_with(self.obs))
    }

    fn enter_compute(&self) -> Result<ContextGuard> {
        self.cuda.enter()
    }

    fn cuda_stream(&self) -> Result<CUstream> {
        Ok(self.cuda.stream())
    }

    fn create_feature(&self, feature_id: &str) -> Result<Feature> {
        Feature::new(self.ar, feature_id)
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Image> {
        Image::new(self.cv, desc)
    }

    fn create_input_image(&self, width: u32, height: u32) -> Result<TextureImage> {
        let gfx = GraphicsGuard::enter_with(self.obs);
        TextureImage::new(self.cv, &gfx, width, height)
    }

    fn copy_frame(&self, dst: &mut TextureImage, frame: &Texture) -> Result<()> {
        let gfx = GraphicsGuard::enter_with(self.obs);
        dst.texture_mut().copy_from(&gfx, frame)
    }

    fn convert(&self, src: &mut TextureImage, dst: &mut Image, tmp: &mut Image) -> Result<()> {
        src.transfer_to(dst, 1.0, self.cuda.stream(), Some(tmp))
    }

    fn status_string(&self, status: NvCvStatus) -> String {
        self.cv.error_string(status)
    }
}

impl std::fmt::Debug for NvidiaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvidiaRuntime")
            .field("cuda", &self.cuda)
            .field("texture_interop", &self.cv.supports_texture_interop())
            .finish()
    }
}
