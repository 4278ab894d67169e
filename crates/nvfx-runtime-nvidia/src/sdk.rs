//! Vendor SDK library discovery.
//!
//! Resolution is a pure function of the configuration and the two
//! environment values so it can be tested without touching the process
//! environment; [`SdkLocations::from_env`] reads the real variables.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use nvfx_core::dylib::{candidates_in, platform_file_name};
use nvfx_pipeline::FaceDetectionConfig;

pub const AR_SDK_PATH_ENV: &str = "NV_AR_SDK_PATH";
pub const CV_SDK_PATH_ENV: &str = "NV_CV_SDK_PATH";

/// Library stem of the NvAR feature library.
pub const AR_LIBRARY: &str = "nvARPose";
/// Library stem of the NvCVImage library.
pub const CV_LIBRARY: &str = "NVCVImage";

/// Default install directory of the AR SDK redistributable.
pub fn default_sdk_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\NVIDIA Corporation\NVIDIA AR SDK")
    } else {
        PathBuf::from("/usr/local/ARSDK/lib")
    }
}

/// Ordered directories searched for each vendor library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdkLocations {
    pub ar_dirs: Vec<PathBuf>,
    pub cv_dirs: Vec<PathBuf>,
}

fn non_empty(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn push_unique(dirs: &mut Vec<PathBuf>, dir: Option<&Path>) {
    if let Some(dir) = dir {
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_path_buf());
        }
    }
}

impl SdkLocations {
    /// Resolve search directories.
    ///
    /// The AR library is searched in the configured directory, then
    /// `ar_env`, then the default install directory.  The CV library is
    /// searched in its own configured directory and `cv_env` first, then
    /// everywhere the AR library is, since the SDK ships both side by side.
    pub fn resolve(
        cfg: &FaceDetectionConfig,
        ar_env: Option<OsString>,
        cv_env: Option<OsString>,
    ) -> Self {
        let ar_env = non_empty(ar_env);
        let cv_env = non_empty(cv_env);
        let default = default_sdk_dir();

        let mut ar_dirs = Vec::new();
        push_unique(&mut ar_dirs, cfg.ar_sdk_path.as_deref());
        push_unique(&mut ar_dirs, ar_env.as_deref());
        push_unique(&mut ar_dirs, Some(default.as_path()));

        let mut cv_dirs = Vec::new();
        push_unique(&mut cv_dirs, cfg.cv_sdk_path.as_deref());
        push_unique(&mut cv_dirs, cv_env.as_deref());
        for dir in &ar_dirs {
            push_unique(&mut cv_dirs, Some(dir.as_path()));
        }

        Self { ar_dirs, cv_dirs }
    }

    /// Resolve against the process environment.
    pub fn from_env(cfg: &FaceDetectionConfig) -> Self {
        Self::resolve(
            cfg,
            env::var_os(AR_SDK_PATH_ENV),
            env::var_os(CV_SDK_PATH_ENV),
        )
    }

    /// Library paths to try for NvAR, ending with the bare file name.
    pub fn ar_candidates(&self) -> Vec<String> {
        candidates_in(
            self.ar_dirs.iter().map(PathBuf::as_path),
            &platform_file_name(AR_LIBRARY),
        )
    }

    /// Library paths to try for NvCVImage, ending with the bare file name.
    pub fn cv_candidates(&self) -> Vec<String> {
        candidates_in(
            self.cv_dirs.iter().map(PathBuf::as_path),
            &platform_file_name(CV_LIBRARY),
        )
    }
}
