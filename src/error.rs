use thiserror::Error;

/// Driver-level failure crossing the [`crate::Gpu`] seam.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that end a render session. The caller tears down whatever was
/// created and returns to the settings dialog.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to create device on adapter '{adapter}'")]
    DeviceCreation {
        adapter: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to create swap chain")]
    SwapChain(#[source] BackendError),

    #[error("failed to create shared texture ({width}x{height})")]
    SharedTexture {
        width: u32,
        height: u32,
        #[source]
        source: BackendError,
    },

    #[error("failed to create render target view")]
    RenderTargetView(#[source] BackendError),

    #[error("failed to query shared handle")]
    SharedHandleQuery(#[source] BackendError),

    #[error("shared texture returned a null handle")]
    NullSharedHandle,

    #[error("failed to open shared texture on the display device")]
    OpenSharedResource(#[source] BackendError),

    #[error("failed to fetch swap chain back buffer")]
    BackBuffer(#[source] BackendError),

    #[error("failed to resize swap chain buffers to {width}x{height}")]
    ResizeBuffers {
        width: u32,
        height: u32,
        #[source]
        source: BackendError,
    },

    #[error("present failed")]
    Present(#[source] BackendError),

    #[error("render window could not be created")]
    Window(#[source] BackendError),

    #[error("graphics backend initialization failed")]
    Backend(#[source] BackendError),
}

/// Rejected settings; a session is never started with these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{field} must be a whole number")]
    NotANumber { field: &'static str },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("no adapter at index {0}")]
    UnknownAdapter(usize),

    #[error("adapter {adapter} has no output at index {output}")]
    UnknownOutput { adapter: usize, output: usize },

    #[error("no GPU adapters found")]
    NoAdapters,
}

/// Small error for backend calls that succeed but hand back nothing.
#[derive(Error, Debug)]
#[error("{0} was not returned by the driver")]
pub struct MissingObject(pub &'static str);
