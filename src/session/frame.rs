use super::device_pair::DevicePair;
use super::presentation::PresentationTarget;
use super::shared_surface::SharedSurfaceBridge;
use crate::error::SessionError;
use crate::gpu::Gpu;
use crate::log_debug;

/// Background color, a deep blue.
pub const CLEAR_COLOR: [f32; 4] = [13.0 / 255.0, 71.0 / 255.0, 161.0 / 255.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoRenderTarget,
    NoSwapChain,
    NoSharedSurface,
    /// Shared surface and back buffer disagree on size; copying would be undefined.
    SizeMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// A resource is missing, usually mid-resize. Not an error; the next
    /// tick tries again.
    Skipped(SkipReason),
}

pub struct FrameProducer {
    color: [f32; 4],
}

impl Default for FrameProducer {
    fn default() -> Self {
        Self { color: CLEAR_COLOR }
    }
}

impl FrameProducer {
    pub fn new(color: [f32; 4]) -> Self {
        Self { color }
    }

    pub fn render_frame<G: Gpu>(
        &self,
        gpu: &G,
        devices: &DevicePair<G>,
        target: &PresentationTarget<G>,
        bridge: &SharedSurfaceBridge<G>,
    ) -> Result<FrameOutcome, SessionError> {
        let Some(back_buffer_view) = target.view() else {
            return Ok(skip(SkipReason::NoRenderTarget));
        };
        let Some(swap_chain) = target.swap_chain() else {
            return Ok(skip(SkipReason::NoSwapChain));
        };

        if devices.is_cross_adapter() {
            let Some(surface) = bridge.surface() else {
                return Ok(skip(SkipReason::NoSharedSurface));
            };

            let back_buffer = gpu.back_buffer(swap_chain).map_err(SessionError::BackBuffer)?;
            let (dst, src) = (gpu.texture_size(&back_buffer), gpu.texture_size(surface.imported()));
            if dst != src {
                log_debug!("Back buffer is {}, shared surface is {}", dst, src);
                return Ok(skip(SkipReason::SizeMismatch));
            }

            gpu.clear(devices.render(), surface.view(), self.color);
            // Shared memory reads on the other device are not synchronized
            // with this context; the copy below only sees submitted work.
            gpu.flush(devices.render());
            gpu.copy_texture(devices.display(), &back_buffer, surface.imported());
        } else {
            gpu.clear(devices.render(), back_buffer_view, self.color);
        }

        gpu.present(swap_chain, target.interval()).map_err(SessionError::Present)?;
        Ok(FrameOutcome::Presented)
    }
}

fn skip(reason: SkipReason) -> FrameOutcome {
    log_debug!("Frame skipped: {:?}", reason);
    FrameOutcome::Skipped(reason)
}
