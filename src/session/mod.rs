//! One render session: devices, shared surface, swap chain and the frame
//! loop driving them, from settings confirmation until the window closes.

pub mod device_pair;
pub mod frame;
pub mod pacing;
pub mod presentation;
pub mod render_loop;
pub mod resize;
pub mod shared_surface;

pub use device_pair::DevicePair;
pub use frame::{FrameOutcome, FrameProducer, SkipReason, CLEAR_COLOR};
pub use pacing::{FramePacer, FrameStats};
pub use presentation::PresentationTarget;
pub use render_loop::{EventPump, LoopExit, RenderLoop, Step, WindowEvent};
pub use resize::ResizeCoordinator;
pub use shared_surface::{SharedSurface, SharedSurfaceBridge};

use crate::adapters::AdapterSelection;
use crate::error::SessionError;
use crate::gpu::{Extent, Gpu, PresentInterval};
use crate::settings::{frame_interval, RenderSettings, WindowMode};
use crate::{log_info, log_warn};
use std::time::Duration;

/// Everything a session is started from. Fixed for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub selection: AdapterSelection,
    pub size: Extent,
    pub target_fps: u32,
    pub mode: WindowMode,
}

impl SessionConfig {
    /// Borderless sessions take the output's desktop bounds instead of the
    /// requested size.
    pub fn new(selection: AdapterSelection, settings: &RenderSettings) -> Self {
        let size = match settings.mode {
            WindowMode::Windowed => settings.size,
            WindowMode::Borderless => selection.output().bounds.extent(),
        };

        Self {
            selection,
            size,
            target_fps: settings.target_fps,
            mode: settings.mode,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        frame_interval(self.target_fps)
    }
}

pub struct RenderSession<G: Gpu> {
    target: PresentationTarget<G>,
    bridge: SharedSurfaceBridge<G>,
    devices: DevicePair<G>,
    producer: FrameProducer,
    resize: ResizeCoordinator,
    frame_interval: Duration,
    size: Extent,
    cross_adapter: bool,
    gpu: G,
}

impl<G: Gpu> RenderSession<G> {
    /// Devices first, then the shared surface when the adapters differ, then
    /// the swap chain. Anything created before a failure is released before
    /// the error is returned.
    pub fn start(gpu: G, config: &SessionConfig) -> Result<Self, SessionError> {
        let selection = &config.selection;
        log_info!(
            "Starting session: render on '{}', display on '{}' ({}), {} @ {} fps, {}",
            selection.render().name,
            selection.display().name,
            selection.output().device_name,
            config.size,
            config.target_fps,
            config.mode.label()
        );

        let devices = DevicePair::create(&gpu, selection)?;
        let cross_adapter = devices.is_cross_adapter();

        let mut bridge = SharedSurfaceBridge::new();
        if cross_adapter {
            bridge.create(&gpu, devices.render(), devices.display(), config.size)?;
        }

        let interval = if cross_adapter {
            PresentInterval::VerticalSync
        } else {
            PresentInterval::Immediate
        };
        let target = PresentationTarget::create(&gpu, devices.display(), config.size, config.mode, interval)?;

        log_info!("Session started (cross-adapter: {})", cross_adapter);

        Ok(Self {
            target,
            bridge,
            devices,
            producer: FrameProducer::default(),
            resize: ResizeCoordinator::new(),
            frame_interval: config.frame_interval(),
            size: config.size,
            cross_adapter,
            gpu,
        })
    }

    pub fn cross_adapter(&self) -> bool {
        self.cross_adapter
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn shared_surface_size(&self) -> Option<Extent> {
        self.bridge.size()
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Queues a size change for the next idle tick.
    pub fn request_resize(&mut self, size: Extent) {
        self.resize.request(size);
    }

    pub fn has_pending_resize(&self) -> bool {
        self.resize.pending().is_some()
    }

    /// The size the session will have once any pending resize is applied.
    pub fn requested_size(&self) -> Extent {
        self.resize.pending().unwrap_or(self.size)
    }

    /// Returns whether a resize sequence ran.
    pub fn apply_pending_resize(&mut self) -> Result<bool, SessionError> {
        match self.resize.take_pending() {
            Some(size) => self.on_resize(size),
            None => Ok(false),
        }
    }

    /// Empty sizes (minimized) and the current size are ignored.
    pub fn on_resize(&mut self, size: Extent) -> Result<bool, SessionError> {
        if size.is_empty() || size == self.size {
            return Ok(false);
        }

        ResizeCoordinator::on_resize(&self.gpu, &self.devices, &mut self.target, &mut self.bridge, size)?;
        self.size = size;
        Ok(true)
    }

    pub fn render_frame(&mut self) -> Result<FrameOutcome, SessionError> {
        self.producer
            .render_frame(&self.gpu, &self.devices, &self.target, &self.bridge)
    }
}

impl<G: Gpu> Drop for RenderSession<G> {
    fn drop(&mut self) {
        // Reverse of creation; the devices go last when the fields drop
        self.target.release_render_target();
        self.bridge.destroy();
        self.target.shutdown(&self.gpu);

        if self.has_pending_resize() {
            log_warn!("Session ended with an unapplied resize");
        }
        log_info!("Session torn down");
    }
}
