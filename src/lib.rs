pub mod logger;
pub mod state;
pub mod error;
pub mod settings;
pub mod adapters;
pub mod gpu;
pub mod session;

#[cfg(windows)]
pub mod window;

pub use logger::*;
pub use state::{AppState, StateManager};
pub use error::{BackendError, SessionError, SettingsError};
pub use settings::{RenderSettings, SettingsForm, WindowMode};
pub use adapters::{AdapterInfo, AdapterSelection, AdapterSnapshot, OutputInfo, OutputRef};
pub use gpu::{Extent, Gpu, PresentInterval, SharedHandle};
pub use session::{EventPump, FrameOutcome, LoopExit, RenderLoop, RenderSession, SessionConfig, WindowEvent};
