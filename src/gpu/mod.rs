//! The graphics driver calls the render session depends on.
//!
//! Every associated type is an owning handle: dropping it releases the
//! underlying driver object. Components hold them in `Option`s so that
//! releasing a resource is `take()` and "currently absent" is `None`.

use crate::adapters::AdapterInfo;
use crate::error::BackendError;
use crate::settings::WindowMode;

#[cfg(windows)]
pub mod d3d11;

#[cfg(test)]
pub(crate) mod recording;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// OS handle through which a second device opens a shared texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentInterval {
    /// Present as soon as possible; the frame cap comes from the loop.
    Immediate,
    /// Wait for the next vertical blank.
    VerticalSync,
}

impl PresentInterval {
    pub fn sync_interval(self) -> u32 {
        match self {
            PresentInterval::Immediate => 0,
            PresentInterval::VerticalSync => 1,
        }
    }
}

pub trait Gpu {
    /// A device together with its immediate context.
    type Device;
    type Texture;
    type View;
    type SwapChain;

    fn create_device(&self, adapter: &AdapterInfo) -> Result<Self::Device, BackendError>;

    /// Swap chain for the session window, double buffered, discard after present.
    fn create_swap_chain(&self, device: &Self::Device, size: Extent, mode: WindowMode) -> Result<Self::SwapChain, BackendError>;

    /// RGBA8 render target that other devices may open through a shared handle.
    fn create_shareable_texture(&self, device: &Self::Device, size: Extent) -> Result<Self::Texture, BackendError>;

    fn create_render_target_view(&self, device: &Self::Device, texture: &Self::Texture) -> Result<Self::View, BackendError>;

    /// `Ok(None)` when the driver hands back a null handle.
    fn shared_handle(&self, texture: &Self::Texture) -> Result<Option<SharedHandle>, BackendError>;

    fn open_shared_texture(&self, device: &Self::Device, handle: SharedHandle) -> Result<Self::Texture, BackendError>;

    fn texture_size(&self, texture: &Self::Texture) -> Extent;

    fn back_buffer(&self, swap_chain: &Self::SwapChain) -> Result<Self::Texture, BackendError>;

    /// Keeps buffer count, format and flags. Fails while any view of a
    /// buffer is alive.
    fn resize_buffers(&self, swap_chain: &Self::SwapChain, size: Extent) -> Result<(), BackendError>;

    /// Binds `view` as the only render target of the device context and clears it.
    fn clear(&self, device: &Self::Device, view: &Self::View, color: [f32; 4]);

    fn flush(&self, device: &Self::Device);

    fn copy_texture(&self, device: &Self::Device, dst: &Self::Texture, src: &Self::Texture);

    fn present(&self, swap_chain: &Self::SwapChain, interval: PresentInterval) -> Result<(), BackendError>;

    fn exit_fullscreen(&self, swap_chain: &Self::SwapChain);
}
