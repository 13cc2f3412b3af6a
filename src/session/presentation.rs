use crate::error::{MissingObject, SessionError};
use crate::gpu::{Extent, Gpu, PresentInterval};
use crate::settings::WindowMode;
use crate::log_info;

/// Swap chain on the display device plus the view onto its back buffer.
pub struct PresentationTarget<G: Gpu> {
    view: Option<G::View>,
    swap_chain: Option<G::SwapChain>,
    size: Extent,
    interval: PresentInterval,
}

impl<G: Gpu> PresentationTarget<G> {
    pub fn create(
        gpu: &G,
        display: &G::Device,
        size: Extent,
        mode: WindowMode,
        interval: PresentInterval,
    ) -> Result<Self, SessionError> {
        let swap_chain = gpu
            .create_swap_chain(display, size, mode)
            .map_err(SessionError::SwapChain)?;
        log_info!("Swap chain created ({}, {}, {:?} present)", size, mode.label(), interval);

        let mut target = Self { view: None, swap_chain: Some(swap_chain), size, interval };
        target.create_render_target(gpu, display)?;
        Ok(target)
    }

    pub fn create_render_target(&mut self, gpu: &G, display: &G::Device) -> Result<(), SessionError> {
        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| SessionError::BackBuffer(MissingObject("swap chain").into()))?;

        // The back buffer reference itself is dropped at the end of this scope;
        // only the view keeps the buffer referenced.
        let back_buffer = gpu.back_buffer(swap_chain).map_err(SessionError::BackBuffer)?;
        let view = gpu
            .create_render_target_view(display, &back_buffer)
            .map_err(SessionError::RenderTargetView)?;

        self.view = Some(view);
        Ok(())
    }

    pub fn release_render_target(&mut self) {
        self.view = None;
    }

    /// Must be preceded by [`Self::release_render_target`].
    pub fn resize_buffers(&mut self, gpu: &G, size: Extent) -> Result<(), SessionError> {
        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| SessionError::ResizeBuffers {
                width: size.width,
                height: size.height,
                source: MissingObject("swap chain").into(),
            })?;

        gpu.resize_buffers(swap_chain, size)
            .map_err(|source| SessionError::ResizeBuffers { width: size.width, height: size.height, source })?;
        self.size = size;
        Ok(())
    }

    pub fn view(&self) -> Option<&G::View> {
        self.view.as_ref()
    }

    pub fn swap_chain(&self) -> Option<&G::SwapChain> {
        self.swap_chain.as_ref()
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn interval(&self) -> PresentInterval {
        self.interval
    }

    /// Releases the view, leaves any fullscreen state and releases the swap chain.
    pub fn shutdown(&mut self, gpu: &G) {
        self.view = None;
        if let Some(swap_chain) = self.swap_chain.take() {
            gpu.exit_fullscreen(&swap_chain);
        }
    }
}
