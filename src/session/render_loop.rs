use super::frame::FrameOutcome;
use super::pacing::{FramePacer, FrameStats};
use super::RenderSession;
use crate::error::SessionError;
use crate::gpu::{Extent, Gpu};
use crate::settings::{clamp_fps, clamp_size, frame_interval};
use crate::{log_error, log_info};
use std::time::{Duration, Instant};

/// Frame rate while paused.
pub const PAUSED_FPS: u32 = 30;
const STATS_WINDOW: Duration = Duration::from_millis(500);
/// Stats windows between log lines (every 5 seconds).
const STATS_LOG_EVERY: u32 = 10;
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(1);
/// Fps change per Up/Down key press.
pub const FPS_STEP: u32 = 10;
/// Size change per +/- key press, in percent of the current size.
pub const SIZE_STEP_PERCENT: i32 = 10;
/// Targets selected by the 1-4 keys.
pub const FPS_PRESETS: [u32; 4] = [30, 60, 120, 144];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The client area changed size (user drag or a size request landing).
    Resized(Extent),
    Close,
    ReturnToSettings,
    TogglePause,
    SetTargetFps(u32),
    AdjustTargetFps(i32),
    /// Grows or shrinks the client area by a percentage; the loop resizes
    /// the window to match.
    ScaleSize(i32),
    Other,
}

/// Source of window events for the render loop.
pub trait EventPump {
    /// Dispatches at most one pending event without blocking.
    fn poll_event(&mut self) -> Option<WindowEvent>;

    fn set_status(&mut self, _status: &str) {}

    /// Resizes the window's client area. The resulting `Resized` event, if
    /// any, coalesces with the request that caused it.
    fn resize_window(&mut self, _size: Extent) {}
}

#[derive(Debug)]
pub enum LoopExit {
    Closed,
    ReturnToSettings,
    Failed(SessionError),
}

#[derive(Debug)]
pub enum Step {
    Event(WindowEvent),
    Rendered(FrameOutcome),
    /// Nothing to do for this long.
    Idle(Duration),
    Exit(LoopExit),
}

pub struct RenderLoop<G: Gpu> {
    session: RenderSession<G>,
    pacer: FramePacer,
    stats: FrameStats,
    target_fps: u32,
    paused: bool,
    windows_since_log: u32,
}

impl<G: Gpu> RenderLoop<G> {
    pub fn new(session: RenderSession<G>, target_fps: u32) -> Self {
        Self {
            pacer: FramePacer::new(session.frame_interval()),
            session,
            stats: FrameStats::new(STATS_WINDOW),
            target_fps,
            paused: false,
            windows_since_log: 0,
        }
    }

    pub fn session(&self) -> &RenderSession<G> {
        &self.session
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// One loop iteration: handle one event if there is one, otherwise apply
    /// the pending resize and render if the frame interval has elapsed.
    pub fn step(&mut self, pump: &mut impl EventPump, now: Instant) -> Step {
        if let Some(event) = pump.poll_event() {
            match event {
                WindowEvent::Resized(size) => self.session.request_resize(size),
                WindowEvent::Close => return Step::Exit(LoopExit::Closed),
                WindowEvent::ReturnToSettings => return Step::Exit(LoopExit::ReturnToSettings),
                WindowEvent::TogglePause => self.toggle_pause(pump),
                WindowEvent::SetTargetFps(fps) => self.set_target_fps(fps, pump),
                WindowEvent::AdjustTargetFps(delta) => {
                    self.set_target_fps(self.target_fps.saturating_add_signed(delta), pump)
                }
                WindowEvent::ScaleSize(percent) => {
                    let current = self.session.requested_size();
                    let scale = |v: u32| (v as i64 * (100 + percent as i64) / 100).max(0) as u32;
                    self.request_size(Extent::new(scale(current.width), scale(current.height)), pump)
                }
                WindowEvent::Other => {}
            }
            return Step::Event(event);
        }

        if let Err(e) = self.session.apply_pending_resize() {
            return Step::Exit(LoopExit::Failed(e));
        }

        if !self.pacer.is_due(now) {
            return Step::Idle(self.pacer.time_until_due(now));
        }
        self.pacer.mark(now);

        match self.session.render_frame() {
            Ok(outcome) => {
                if outcome == FrameOutcome::Presented {
                    self.record_frame(pump, now);
                }
                Step::Rendered(outcome)
            }
            Err(e) => Step::Exit(LoopExit::Failed(e)),
        }
    }

    /// Runs until the window closes, the user asks for the settings dialog,
    /// or a frame fails. The session is torn down on return.
    pub fn run(mut self, pump: &mut impl EventPump) -> LoopExit {
        loop {
            match self.step(pump, Instant::now()) {
                Step::Exit(exit) => {
                    match &exit {
                        LoopExit::Failed(e) => log_error!("Render loop stopped: {}", e),
                        other => log_info!("Render loop finished: {:?}", other),
                    }
                    return exit;
                }
                Step::Idle(wait) => spin_sleep::sleep(wait.min(MAX_IDLE_SLEEP)),
                Step::Event(_) | Step::Rendered(_) => {}
            }
        }
    }

    fn toggle_pause(&mut self, pump: &mut impl EventPump) {
        self.paused = !self.paused;
        let fps = if self.paused { PAUSED_FPS } else { self.target_fps };
        self.pacer.set_interval(frame_interval(fps));
        self.stats.reset();

        log_info!("{} (pacing at {} fps)", if self.paused { "Paused" } else { "Resumed" }, fps);
        pump.set_status(&self.status_line(None));
    }

    /// Takes effect on the next frame; while paused it only changes the rate
    /// resumed to.
    fn set_target_fps(&mut self, fps: u32, pump: &mut impl EventPump) {
        let fps = clamp_fps(fps);
        if fps == self.target_fps {
            return;
        }
        self.target_fps = fps;
        if !self.paused {
            self.pacer.set_interval(frame_interval(fps));
            self.stats.reset();
        }

        log_info!("Target FPS set to {}", fps);
        pump.set_status(&self.status_line(None));
    }

    fn request_size(&mut self, size: Extent, pump: &mut impl EventPump) {
        let size = clamp_size(size);
        if size == self.session.requested_size() {
            return;
        }

        log_info!("Size change to {} requested", size);
        pump.resize_window(size);
        self.session.request_resize(size);
    }

    fn record_frame(&mut self, pump: &mut impl EventPump, now: Instant) {
        let Some(fps) = self.stats.record(now) else {
            return;
        };
        pump.set_status(&self.status_line(Some(fps)));

        self.windows_since_log += 1;
        if self.windows_since_log >= STATS_LOG_EVERY {
            self.windows_since_log = 0;
            log_info!("Actual FPS: {:.1} (target {})", fps, self.target_fps);
        }
    }

    fn status_line(&self, fps: Option<f64>) -> String {
        let measured = match fps.or(self.stats.fps()) {
            Some(fps) => format!("{:.1}", fps),
            None => "-".to_string(),
        };
        let mut line = format!(
            "CustomFPS - {} fps (target {}) - {}",
            measured,
            self.target_fps,
            self.session.size()
        );
        if self.session.cross_adapter() {
            line.push_str(" - cross-adapter");
        }
        if self.paused {
            line.push_str(" - PAUSED");
        }
        line
    }
}
