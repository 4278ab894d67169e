//! Device context retention, scoped activation and stream ownership.

use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard};

use cudarc::driver::{CudaContext, CudaStream, DriverError, sys};
use tracing::{debug, info, warn};

use nvfx_core::error::{FxError, Result};
use nvfx_core::ffi_types::{CUcontext, CUstream};

fn cuda_err(context: &'static str) -> impl FnOnce(DriverError) -> FxError {
    move |err| FxError::Cuda {
        context,
        reason: format!("{err:?}"),
    }
}

/// Scoped activation of a CUDA context on the current thread.
///
/// Restores whichever context was current before `enter()` when dropped.
/// Not `Send`: CUDA context binding is per thread.
#[must_use = "the context is only current while the guard is alive"]
pub struct ContextGuard {
    prev_ctx: sys::CUcontext,
    restore: bool,
}

impl ContextGuard {
    fn make_current(target_ctx: sys::CUcontext) -> Result<Self> {
        let mut prev_ctx: sys::CUcontext = ptr::null_mut();
        // SAFETY: prev_ctx is a valid out-pointer for the current context.
        unsafe { sys::cuCtxGetCurrent(&mut prev_ctx) }
            .result()
            .map_err(cuda_err("cuCtxGetCurrent"))?;
        let restore = prev_ctx != target_ctx;
        if restore {
            // SAFETY: target_ctx is retained by the owning CudaRuntime.
            unsafe { sys::cuCtxSetCurrent(target_ctx) }
                .result()
                .map_err(cuda_err("cuCtxSetCurrent"))?;
        }
        Ok(Self { prev_ctx, restore })
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if self.restore {
            // SAFETY: prev_ctx was current on this thread when the guard was made.
            let rc = unsafe { sys::cuCtxSetCurrent(self.prev_ctx) };
            if let Err(err) = rc.result() {
                warn!(error = ?err, "cuCtxSetCurrent restore failed");
            }
        }
    }
}

/// CUDA device context plus the compute stream effects run on.
pub struct CudaRuntime {
    ctx: Arc<CudaContext>,
    stream: Mutex<Arc<CudaStream>>,
    ordinal: usize,
}

impl CudaRuntime {
    /// Retain the primary context of `ordinal` and create a compute stream.
    pub fn new(ordinal: usize) -> Result<Self> {
        let count = CudaContext::device_count().map_err(cuda_err("cuDeviceGetCount"))?;
        if count <= 0 {
            return Err(FxError::Cuda {
                context: "cuDeviceGetCount",
                reason: "no CUDA devices".into(),
            });
        }
        if ordinal >= count as usize {
            return Err(FxError::InvalidArgument(format!(
                "CUDA device ordinal {ordinal} out of range ({count} devices)"
            )));
        }

        let ctx = CudaContext::new(ordinal).map_err(cuda_err("CudaContext::new"))?;
        let stream = ctx.new_stream().map_err(cuda_err("cuStreamCreate"))?;
        let name = ctx.name().unwrap_or_else(|_| "unknown".into());
        info!(ordinal, device = %name, "CUDA context initialized");

        Ok(Self {
            ctx,
            stream: Mutex::new(stream),
            ordinal,
        })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Raw context handle.
    pub fn context(&self) -> CUcontext {
        self.ctx.cu_ctx() as CUcontext
    }

    /// Make the device context current until the guard is dropped.
    pub fn enter(&self) -> Result<ContextGuard> {
        ContextGuard::make_current(self.ctx.cu_ctx())
    }

    fn stream_slot(&self) -> MutexGuard<'_, Arc<CudaStream>> {
        // A poisoned slot still holds a valid stream.
        self.stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw handle of the current compute stream.
    pub fn stream(&self) -> CUstream {
        self.stream_slot().cu_stream() as CUstream
    }

    /// Replace the compute stream.
    ///
    /// Work queued on the old stream is drained first.  Holders of the old
    /// raw handle must re-bind before queuing more work; `FaceDetection`
    /// compares handles at the start of every frame.
    pub fn recreate_stream(&self) -> Result<CUstream> {
        let fresh = self.ctx.new_stream().map_err(cuda_err("cuStreamCreate"))?;
        let mut slot = self.stream_slot();
        slot.synchronize().map_err(cuda_err("cuStreamSynchronize"))?;
        *slot = fresh;
        let raw = slot.cu_stream() as CUstream;
        debug!(stream = ?raw, "CUDA stream recreated");
        Ok(raw)
    }

    /// Block until all work queued on the compute stream has finished.
    pub fn synchronize(&self) -> Result<()> {
        self.stream_slot()
            .synchronize()
            .map_err(cuda_err("cuStreamSynchronize"))
    }
}

impl std::fmt::Debug for CudaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaRuntime")
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}
