//! JSON configuration for face-detection effect instances.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nvfx_core::error::{FxError, Result};

use crate::facedetection::MAX_TRACKED_FACES;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    pub config_schema_version: u32,
    /// Faces tracked per frame, 1..=`MAX_TRACKED_FACES`.
    pub tracking_limit: usize,
    /// CUDA device the feature runs on.
    pub device_ordinal: usize,
    /// Model directory override; the SDK's bundled models otherwise.
    pub model_dir: Option<PathBuf>,
    /// Directory holding the NvAR libraries.  Falls back to
    /// `NV_AR_SDK_PATH`, then the default install location.
    pub ar_sdk_path: Option<PathBuf>,
    /// Directory holding the NvCVImage library.  Falls back to
    /// `NV_CV_SDK_PATH`, then the AR SDK directory.
    pub cv_sdk_path: Option<PathBuf>,
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            config_schema_version: CONFIG_SCHEMA_VERSION,
            tracking_limit: 1,
            device_ordinal: 0,
            model_dir: None,
            ar_sdk_path: None,
            cv_sdk_path: None,
        }
    }
}

impl FaceDetectionConfig {
    pub fn from_json_str(data: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(data)
            .map_err(|err| FxError::Config(format!("Invalid face detection config JSON: {err}")))?;

        let Some(version_value) = value.get("config_schema_version") else {
            return Err(FxError::Config(format!(
                "Config schema mismatch: expected {CONFIG_SCHEMA_VERSION}, got missing"
            )));
        };
        let Some(version) = version_value.as_u64() else {
            return Err(FxError::Config(format!(
                "Config schema mismatch: expected {CONFIG_SCHEMA_VERSION}, got non-integer"
            )));
        };
        if version != u64::from(CONFIG_SCHEMA_VERSION) {
            return Err(FxError::Config(format!(
                "Config schema mismatch: expected {CONFIG_SCHEMA_VERSION}, got {version}"
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|err| FxError::Config(format!("Invalid face detection config JSON: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|err| {
            FxError::Config(format!(
                "Failed to read face detection config from {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json_str(&data)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| FxError::Config(format!("Failed to serialize config: {err}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.config_schema_version != CONFIG_SCHEMA_VERSION {
            return Err(FxError::Config(format!(
                "Config schema mismatch: expected {CONFIG_SCHEMA_VERSION}, got {}",
                self.config_schema_version
            )));
        }
        if !(1..=MAX_TRACKED_FACES).contains(&self.tracking_limit) {
            return Err(FxError::Config(format!(
                "tracking_limit must be in 1..={MAX_TRACKED_FACES}, got {}",
                self.tracking_limit
            )));
        }
        if let Some(dir) = &self.model_dir {
            if dir.as_os_str().is_empty() {
                return Err(FxError::Config("model_dir must not be empty".into()));
            }
        }
        Ok(())
    }
}
