//! Scoped host graphics context.

use std::marker::PhantomData;

use nvfx_core::error::Result;

use crate::sys::{self, ObsApi};

/// Holds the host graphics context until dropped.
///
/// The host context is re-entrant, so nested guards are allowed.  The guard
/// is bound to the thread that entered.
#[must_use = "the graphics context is left as soon as the guard is dropped"]
pub struct GraphicsGuard {
    api: &'static ObsApi,
    _not_send: PhantomData<*const ()>,
}

impl GraphicsGuard {
    /// Enter the graphics context of the running host.
    pub fn enter() -> Result<Self> {
        Ok(Self::enter_with(sys::api()?))
    }

    pub fn enter_with(api: &'static ObsApi) -> Self {
        // SAFETY: obs_enter_graphics has no preconditions.
        unsafe { (api.enter_graphics)() };
        Self {
            api,
            _not_send: PhantomData,
        }
    }

    pub fn api(&self) -> &'static ObsApi {
        self.api
    }
}

impl Drop for GraphicsGuard {
    fn drop(&mut self) {
        // SAFETY: paired with the enter in the constructor.
        unsafe { (self.api.leave_graphics)() };
    }
}
