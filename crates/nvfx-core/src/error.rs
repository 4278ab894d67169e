//! Typed error hierarchy for the effect runtime.
//!
//! Every vendor call that returns a status code is checked at the FFI
//! boundary and converted into one of these variants, so callers never
//! compare raw integers.
//!
//! # Error codes
//!
//! Each variant maps to a stable integer code via [`FxError::error_code`]
//! for structured logging without string parsing.

use std::fmt;

/// Status code returned by the vendor image and feature libraries.
///
/// Zero is success, every negative value is a distinct failure.  Codes at or
/// below `-100` wrap a CUDA driver error (`-100 - cuda_code`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NvCvStatus(pub i32);

impl NvCvStatus {
    pub const SUCCESS: Self = Self(0);
    pub const ERR_GENERAL: Self = Self(-1);
    pub const ERR_PARAMETER: Self = Self(-7);
    pub const ERR_MISSINGINPUT: Self = Self(-15);
    pub const CUDA_BASE: i32 = -100;

    #[inline]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Symbolic name from the vendor status table.
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "NVCV_SUCCESS",
            -1 => "NVCV_ERR_GENERAL",
            -2 => "NVCV_ERR_UNIMPLEMENTED",
            -3 => "NVCV_ERR_MEMORY",
            -4 => "NVCV_ERR_EFFECT",
            -5 => "NVCV_ERR_SELECTOR",
            -6 => "NVCV_ERR_BUFFER",
            -7 => "NVCV_ERR_PARAMETER",
            -8 => "NVCV_ERR_MISMATCH",
            -9 => "NVCV_ERR_PIXELFORMAT",
            -10 => "NVCV_ERR_MODEL",
            -11 => "NVCV_ERR_LIBRARY",
            -12 => "NVCV_ERR_INITIALIZATION",
            -13 => "NVCV_ERR_FILE",
            -14 => "NVCV_ERR_FEATURENOTFOUND",
            -15 => "NVCV_ERR_MISSINGINPUT",
            -16 => "NVCV_ERR_RESOLUTION",
            -17 => "NVCV_ERR_UNSUPPORTEDGPU",
            -18 => "NVCV_ERR_WRONGGPU",
            -19 => "NVCV_ERR_UNSUPPORTEDDRIVER",
            -20 => "NVCV_ERR_MODELDEPENDENCIES",
            -21 => "NVCV_ERR_PARSE",
            -22 => "NVCV_ERR_MODELSUBSTITUTION",
            -23 => "NVCV_ERR_READ",
            -24 => "NVCV_ERR_WRITE",
            -25 => "NVCV_ERR_PARAMREADONLY",
            -26 => "NVCV_ERR_TRT_ENQUEUE",
            -27 => "NVCV_ERR_TRT_BINDINGS",
            -28 => "NVCV_ERR_TRT_CONTEXT",
            -29 => "NVCV_ERR_TRT_INFER",
            -30 => "NVCV_ERR_TRT_ENGINE",
            -31 => "NVCV_ERR_NPP",
            -32 => "NVCV_ERR_CONFIG",
            -33 => "NVCV_ERR_TOOSMALL",
            -34 => "NVCV_ERR_TOOBIG",
            -35 => "NVCV_ERR_WRONGSIZE",
            -36 => "NVCV_ERR_OBJECTNOTFOUND",
            -37 => "NVCV_ERR_SINGULAR",
            -38 => "NVCV_ERR_NOTHINGRENDERED",
            -39 => "NVCV_ERR_CONVERGENCE",
            -98 => "NVCV_ERR_OPENGL",
            -99 => "NVCV_ERR_DIRECT3D",
            code if code <= Self::CUDA_BASE => "NVCV_ERR_CUDA",
            _ => "NVCV_ERR_UNKNOWN",
        }
    }

    /// CUDA driver error wrapped by this status, if any.
    pub const fn cuda_code(self) -> Option<i32> {
        if self.0 <= Self::CUDA_BASE {
            Some(Self::CUDA_BASE - self.0)
        } else {
            None
        }
    }
}

impl fmt::Display for NvCvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cuda_code() {
            Some(cuda) => write!(f, "{} ({}, CUDA error {cuda})", self.name(), self.0),
            None => write!(f, "{} ({})", self.name(), self.0),
        }
    }
}

impl fmt::Debug for NvCvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Check a vendor status, mapping failure through `on_error`.
#[inline]
pub fn check_status(status: i32, on_error: impl FnOnce(NvCvStatus) -> FxError) -> Result<()> {
    let status = NvCvStatus(status);
    if status.is_success() {
        Ok(())
    } else {
        Err(on_error(status))
    }
}

/// All errors originating from the effect runtime.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    // ── Compute context ──────────────────────────────────────────────
    #[error("CUDA error in {context}: {reason}")]
    Cuda { context: &'static str, reason: String },

    // ── Feature graph ────────────────────────────────────────────────
    #[error("Failed to bind feature parameter '{param}': {status}")]
    Binding { param: String, status: NvCvStatus },

    #[error("Feature load failed: {status}")]
    Load { status: NvCvStatus },

    #[error("Feature run failed: {status}")]
    Run { status: NvCvStatus },

    #[error("{operation} failed: {status}")]
    Vendor {
        operation: &'static str,
        status: NvCvStatus,
    },

    // ── Images ───────────────────────────────────────────────────────
    #[error("Image transfer failed: {status}")]
    Transfer { status: NvCvStatus },

    // ── Host ─────────────────────────────────────────────────────────
    #[error("Host error: {0}")]
    Host(String),

    #[error("Failed to load shared library: {0}")]
    LibraryLoad(String),

    // ── Result access ────────────────────────────────────────────────
    #[error("No tracked faces")]
    NoResults,

    #[error("Index {index} out of range for {count} tracked faces")]
    IndexOutOfRange { index: usize, count: usize },

    // ── Contracts ────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl FxError {
    /// Stable integer error code for structured logging.
    ///
    /// Codes are grouped by category:
    /// - 1xx: CUDA/compute
    /// - 2xx: Feature graph
    /// - 3xx: Images and transfer
    /// - 4xx: Host and library loading
    /// - 5xx: Result access
    /// - 6xx: Contracts and configuration
    pub fn error_code(&self) -> u32 {
        match self {
            Self::Cuda { .. } => 100,
            Self::Binding { .. } => 200,
            Self::Load { .. } => 201,
            Self::Run { .. } => 202,
            Self::Vendor { .. } => 203,
            Self::Transfer { .. } => 300,
            Self::Host(_) => 400,
            Self::LibraryLoad(_) => 401,
            Self::NoResults => 500,
            Self::IndexOutOfRange { .. } => 501,
            Self::InvalidArgument(_) => 600,
            Self::Config(_) => 601,
            Self::InvariantViolation(_) => 602,
        }
    }

    /// Whether this error only describes a failed read of detection results.
    ///
    /// Such errors leave the pipeline untouched; every other error aborts
    /// the current frame.
    pub fn is_access_error(&self) -> bool {
        matches!(self, Self::NoResults | Self::IndexOutOfRange { .. })
    }

    /// Vendor status carried by this error, if any.
    pub fn status(&self) -> Option<NvCvStatus> {
        match self {
            Self::Binding { status, .. }
            | Self::Load { status }
            | Self::Run { status }
            | Self::Vendor { status, .. }
            | Self::Transfer { status } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, FxError>;
