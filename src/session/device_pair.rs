use crate::adapters::{AdapterInfo, AdapterSelection};
use crate::error::SessionError;
use crate::gpu::Gpu;
use crate::log_info;

/// One device when rendering and display share an adapter, otherwise a
/// rendering device plus a display device.
pub struct DevicePair<G: Gpu> {
    render: G::Device,
    display: Option<G::Device>,
}

impl<G: Gpu> DevicePair<G> {
    pub fn create(gpu: &G, selection: &AdapterSelection) -> Result<Self, SessionError> {
        let render = create_device(gpu, selection.render())?;

        // If this fails the render device above is released on return
        let display = if selection.cross_adapter() {
            Some(create_device(gpu, selection.display())?)
        } else {
            None
        };

        Ok(Self { render, display })
    }

    pub fn render(&self) -> &G::Device {
        &self.render
    }

    /// The device owning the swap chain. Same as [`Self::render`] unless
    /// cross-adapter.
    pub fn display(&self) -> &G::Device {
        self.display.as_ref().unwrap_or(&self.render)
    }

    pub fn is_cross_adapter(&self) -> bool {
        self.display.is_some()
    }
}

fn create_device<G: Gpu>(gpu: &G, adapter: &AdapterInfo) -> Result<G::Device, SessionError> {
    let device = gpu
        .create_device(adapter)
        .map_err(|source| SessionError::DeviceCreation { adapter: adapter.name.clone(), source })?;
    log_info!("Created D3D11 device on '{}' (adapter {})", adapter.name, adapter.index);
    Ok(device)
}
