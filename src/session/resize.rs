use super::device_pair::DevicePair;
use super::presentation::PresentationTarget;
use super::shared_surface::SharedSurfaceBridge;
use crate::error::SessionError;
use crate::gpu::{Extent, Gpu};
use crate::{log_debug, log_info};

/// Collects size-change notifications between ticks; only the latest counts.
#[derive(Debug, Default)]
pub struct ResizeCoordinator {
    pending: Option<Extent>,
}

impl ResizeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, size: Extent) {
        if let Some(previous) = self.pending.replace(size) {
            log_debug!("Resize to {} superseded by {}", previous, size);
        }
    }

    pub fn pending(&self) -> Option<Extent> {
        self.pending
    }

    pub fn take_pending(&mut self) -> Option<Extent> {
        self.pending.take()
    }

    /// Rebuilds everything sized to the window. The back-buffer view goes
    /// first because buffers cannot be resized while a view references them;
    /// the shared surface is rebuilt before the view so the next copy sees
    /// matching dimensions.
    pub fn on_resize<G: Gpu>(
        gpu: &G,
        devices: &DevicePair<G>,
        target: &mut PresentationTarget<G>,
        bridge: &mut SharedSurfaceBridge<G>,
        size: Extent,
    ) -> Result<(), SessionError> {
        let previous = target.size();

        target.release_render_target();
        if devices.is_cross_adapter() {
            bridge.destroy();
        }

        target.resize_buffers(gpu, size)?;

        if devices.is_cross_adapter() {
            bridge.create(gpu, devices.render(), devices.display(), size)?;
        }
        target.create_render_target(gpu, devices.display())?;

        log_info!("Resized {} -> {}", previous, size);
        Ok(())
    }
}
