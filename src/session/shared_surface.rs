//! Offscreen color target shared between the rendering and display devices.
//!
//! A view created on one device cannot be bound on another device's context,
//! so the texture is opened a second time on the display device through an OS
//! shared handle. The display device then copies from its own handle into its
//! own back buffer.

use crate::error::SessionError;
use crate::gpu::{Extent, Gpu};
use crate::{log_error, log_info};

pub struct SharedSurface<G: Gpu> {
    // Field order is release order: display side first
    imported: G::Texture,
    view: G::View,
    texture: G::Texture,
    size: Extent,
}

impl<G: Gpu> SharedSurface<G> {
    fn create(gpu: &G, render: &G::Device, display: &G::Device, size: Extent) -> Result<Self, SessionError> {
        let texture = gpu
            .create_shareable_texture(render, size)
            .map_err(|source| SessionError::SharedTexture { width: size.width, height: size.height, source })?;

        let view = gpu
            .create_render_target_view(render, &texture)
            .map_err(SessionError::RenderTargetView)?;

        let handle = gpu
            .shared_handle(&texture)
            .map_err(SessionError::SharedHandleQuery)?
            .ok_or(SessionError::NullSharedHandle)?;

        let imported = gpu
            .open_shared_texture(display, handle)
            .map_err(SessionError::OpenSharedResource)?;

        Ok(Self { imported, view, texture, size })
    }

    /// Render target on the rendering device.
    pub fn view(&self) -> &G::View {
        &self.view
    }

    /// The same memory as seen from the display device.
    pub fn imported(&self) -> &G::Texture {
        &self.imported
    }

    pub fn texture(&self) -> &G::Texture {
        &self.texture
    }

    pub fn size(&self) -> Extent {
        self.size
    }
}

pub struct SharedSurfaceBridge<G: Gpu> {
    surface: Option<SharedSurface<G>>,
}

impl<G: Gpu> Default for SharedSurfaceBridge<G> {
    fn default() -> Self {
        Self { surface: None }
    }
}

impl<G: Gpu> SharedSurfaceBridge<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing surface with one of `size`. On failure nothing
    /// is left allocated and the bridge is empty.
    pub fn create(&mut self, gpu: &G, render: &G::Device, display: &G::Device, size: Extent) -> Result<(), SessionError> {
        self.destroy();

        match SharedSurface::create(gpu, render, display, size) {
            Ok(surface) => {
                log_info!("Shared surface created ({})", size);
                self.surface = Some(surface);
                Ok(())
            }
            Err(e) => {
                log_error!("Shared surface creation failed ({}): {}", size, e);
                Err(e)
            }
        }
    }

    pub fn destroy(&mut self) {
        if let Some(surface) = self.surface.take() {
            log_info!("Shared surface destroyed ({})", surface.size);
        }
    }

    pub fn surface(&self) -> Option<&SharedSurface<G>> {
        self.surface.as_ref()
    }

    pub fn size(&self) -> Option<Extent> {
        self.surface.as_ref().map(|s| s.size)
    }
}
