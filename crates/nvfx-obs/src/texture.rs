//! Host graphics textures.

use std::ffi::c_void;
use std::ptr::{self, NonNull};

use nvfx_core::error::{FxError, Result};
use nvfx_core::runtime::HostTexture;

use crate::graphics::GraphicsGuard;
use crate::sys::{GS_RENDER_TARGET, GS_RGBA_UNORM, ObsApi, gs_texture_t};

/// A host texture, either created here (destroyed on drop) or borrowed from
/// the host for the duration of a frame.
pub struct Texture {
    api: &'static ObsApi,
    ptr: NonNull<gs_texture_t>,
    owned: bool,
}

impl Texture {
    /// Create an RGBA render-target texture.
    ///
    /// Requires the graphics context, proven by `gfx`.
    pub fn create(gfx: &GraphicsGuard, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FxError::InvalidArgument(format!(
                "texture size {width}x{height} must be non-zero"
            )));
        }
        let api = gfx.api();
        // SAFETY: the graphics context is held; no initial data is supplied.
        let raw = unsafe {
            (api.texture_create)(
                width,
                height,
                GS_RGBA_UNORM,
                1,
                ptr::null(),
                GS_RENDER_TARGET,
            )
        };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            FxError::Host(format!("gs_texture_create failed for {width}x{height}"))
        })?;
        Ok(Self {
            api,
            ptr,
            owned: true,
        })
    }

    /// Wrap a host-owned texture without taking ownership.
    ///
    /// # Safety
    /// `raw` must be a live host texture that outlives the returned value.
    pub unsafe fn borrowed(api: &'static ObsApi, raw: *mut gs_texture_t) -> Result<Self> {
        let ptr = NonNull::new(raw)
            .ok_or_else(|| FxError::InvalidArgument("null host texture".into()))?;
        Ok(Self {
            api,
            ptr,
            owned: false,
        })
    }

    pub fn as_ptr(&self) -> *mut gs_texture_t {
        self.ptr.as_ptr()
    }

    /// Native graphics API object (`ID3D11Texture2D*` or GL texture name).
    pub fn native_object(&self) -> *mut c_void {
        // SAFETY: ptr is a live texture.
        unsafe { (self.api.texture_get_obj)(self.ptr.as_ptr()) }
    }

    /// GPU copy of `src` into this texture.  Sizes and formats must match.
    pub fn copy_from(&mut self, _gfx: &GraphicsGuard, src: &Texture) -> Result<()> {
        if self.width() != src.width() || self.height() != src.height() {
            return Err(FxError::InvalidArgument(format!(
                "texture copy size mismatch: {}x{} <- {}x{}",
                self.width(),
                self.height(),
                src.width(),
                src.height()
            )));
        }
        // SAFETY: both textures are live and the graphics context is held.
        unsafe { (self.api.copy_texture)(self.ptr.as_ptr(), src.ptr.as_ptr()) };
        Ok(())
    }
}

impl HostTexture for Texture {
    fn width(&self) -> u32 {
        // SAFETY: ptr is a live texture.
        unsafe { (self.api.texture_get_width)(self.ptr.as_ptr()) }
    }

    fn height(&self) -> u32 {
        // SAFETY: ptr is a live texture.
        unsafe { (self.api.texture_get_height)(self.ptr.as_ptr()) }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if self.owned {
            let _gfx = GraphicsGuard::enter_with(self.api);
            // SAFETY: created by gs_texture_create and not yet destroyed.
            unsafe { (self.api.texture_destroy)(self.ptr.as_ptr()) };
        }
    }
}
