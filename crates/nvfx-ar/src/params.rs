//! Feature ids and parameter keys understood by the SDK.

pub const FEATURE_FACE_DETECTION: &str = "FaceDetection";

pub mod config {
    pub const CUDA_STREAM: &str = "NvAR_Parameter_Config_CUDAStream";
    /// Temporal filtering of results; only meaningful when tracking one face.
    pub const TEMPORAL: &str = "NvAR_Parameter_Config_Temporal";
    pub const MODEL_DIR: &str = "NvAR_Parameter_Config_ModelDir";
}

pub mod input {
    pub const IMAGE: &str = "NvAR_Parameter_Input_Image";
}

pub mod output {
    pub const BOUNDING_BOXES: &str = "NvAR_Parameter_Output_BoundingBoxes";
    pub const BOUNDING_BOXES_CONFIDENCE: &str = "NvAR_Parameter_Output_BoundingBoxesConfidence";
}
