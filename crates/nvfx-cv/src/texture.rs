//! Vendor images backed by host textures.

use std::ffi::c_void;
use std::mem::size_of;

use tracing::{debug, warn};

use nvfx_core::error::{FxError, NvCvStatus, Result, check_status};
use nvfx_core::ffi_types::CUstream;
use nvfx_core::runtime::{GpuImage, HostTexture};
use nvfx_obs::{GraphicsGuard, ObsApi, Texture};

use crate::image::Image;
use crate::sys::{CvApi, NvCVImage};
use crate::transfer::{RawImage, transfer};

type MapFn = unsafe extern "C" fn(*mut NvCVImage, CUstream) -> i32;

/// An RGBA host render target wrapped as a vendor image.
///
/// The host can draw into the texture; CUDA work reads it while a
/// [`MappedResource`] is alive.
pub struct TextureImage {
    api: &'static CvApi,
    obs: &'static ObsApi,
    texture: Texture,
    // Boxed so the header address survives moves of the wrapper.
    image: Box<NvCVImage>,
}

impl TextureImage {
    pub fn new(api: &'static CvApi, gfx: &GraphicsGuard, width: u32, height: u32) -> Result<Self> {
        if !api.supports_texture_interop() {
            return Err(FxError::Host(
                "NvCVImage library has no texture interop on this platform".into(),
            ));
        }
        let texture = Texture::create(gfx, width, height)?;
        let mut image = Box::new(NvCVImage::default());
        init_from_texture(api, &texture, &mut image)?;
        debug!(width, height, "Texture image created");
        Ok(Self {
            api,
            obs: gfx.api(),
            texture,
            image,
        })
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn texture_mut(&mut self) -> &mut Texture {
        &mut self.texture
    }

    /// Map the texture for CUDA access on `stream` until the guard drops.
    pub fn map(&mut self, stream: CUstream) -> Result<MappedResource<'_>> {
        let (map, unmap) = match (self.api.map_resource, self.api.unmap_resource) {
            (Some(map), Some(unmap)) => (map, unmap),
            _ => return Err(FxError::Host("NvCVImage_MapResource unavailable".into())),
        };
        // SAFETY: the header was initialised from a live texture.
        let status = unsafe { map(&mut *self.image, stream) };
        check_status(status, |status| FxError::Vendor {
            operation: "NvCVImage_MapResource",
            status,
        })?;
        Ok(MappedResource {
            image: self,
            stream,
            unmap,
        })
    }

    /// Convert this texture into `dst`, mapping it for the duration of the
    /// transfer.
    pub fn transfer_to(
        &mut self,
        dst: &mut Image,
        scale: f32,
        stream: CUstream,
        tmp: Option<&mut Image>,
    ) -> Result<()> {
        let api = self.api;
        let mapped = self.map(stream)?;
        transfer(
            api,
            &mapped,
            dst,
            scale,
            stream,
            tmp.map(|t| t as &mut dyn RawImage),
        )
    }
}

fn init_from_texture(api: &CvApi, texture: &Texture, image: &mut NvCVImage) -> Result<()> {
    let init = api
        .init_from_d3d11_texture
        .ok_or_else(|| FxError::Host("NvCVImage_InitFromD3D11Texture unavailable".into()))?;
    // SAFETY: image is a zeroed header and the texture object is live.
    let status = unsafe { init(image, texture.native_object()) };
    check_status(status, |status| FxError::Vendor {
        operation: "NvCVImage_InitFromD3D11Texture",
        status,
    })
}

impl GpuImage for TextureImage {
    fn width(&self) -> u32 {
        self.texture.width()
    }

    fn height(&self) -> u32 {
        self.texture.height()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let gfx = GraphicsGuard::enter_with(self.obs);
        let texture = Texture::create(&gfx, width, height)?;
        let mut fresh = NvCVImage::default();
        if let Err(err) = init_from_texture(self.api, &texture, &mut fresh) {
            // SAFETY: fresh was only touched by the failed init.
            unsafe { (self.api.dealloc)(&mut fresh) };
            return Err(err);
        }
        // The old texture stays bound until its replacement is initialised.
        // SAFETY: releases the interop state of the old texture; the boxed
        // header keeps its address.
        unsafe { (self.api.dealloc)(&mut *self.image) };
        *self.image = fresh;
        self.texture = texture;
        debug!(width, height, "Texture image resized");
        Ok(())
    }

    fn as_object(&mut self) -> (*mut c_void, usize) {
        ((&mut *self.image as *mut NvCVImage).cast(), size_of::<NvCVImage>())
    }
}

impl RawImage for TextureImage {
    fn raw(&self) -> *const NvCVImage {
        &*self.image
    }

    fn raw_mut(&mut self) -> *mut NvCVImage {
        &mut *self.image
    }
}

impl Drop for TextureImage {
    fn drop(&mut self) {
        let _gfx = GraphicsGuard::enter_with(self.obs);
        // SAFETY: releases interop state before the texture itself is destroyed.
        unsafe { (self.api.dealloc)(&mut *self.image) };
    }
}

/// Keeps a [`TextureImage`] mapped for CUDA access.  Unmaps on drop.
pub struct MappedResource<'a> {
    image: &'a mut TextureImage,
    stream: CUstream,
    unmap: MapFn,
}

impl RawImage for MappedResource<'_> {
    fn raw(&self) -> *const NvCVImage {
        self.image.raw()
    }

    fn raw_mut(&mut self) -> *mut NvCVImage {
        self.image.raw_mut()
    }
}

impl Drop for MappedResource<'_> {
    fn drop(&mut self) {
        // SAFETY: paired with the successful map in TextureImage::map.
        let status = unsafe { (self.unmap)(self.image.raw_mut(), self.stream) };
        if status != 0 {
            warn!(status = %NvCvStatus(status), "NvCVImage_UnmapResource failed");
        }
    }
}
