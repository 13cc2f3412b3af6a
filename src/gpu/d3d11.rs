use crate::adapters::{pack_luid, AdapterInfo};
use crate::error::{BackendError, MissingObject};
use crate::gpu::{Extent, Gpu, PresentInterval, SharedHandle};
use crate::log_info;
use crate::settings::WindowMode;

use windows::{
    core::Interface,
    Win32::{
        Foundation::{HANDLE, HMODULE, HWND},
        Graphics::{
            Direct3D::*,
            Direct3D11::*,
            Dxgi::Common::*,
            Dxgi::*,
        },
    },
};

/// Format of the swap chain buffers and of the shared surface; they must
/// match for `CopyResource`.
pub const SURFACE_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;

pub struct D3D11Device {
    pub device: ID3D11Device,
    pub context: ID3D11DeviceContext,
}

/// Direct3D 11 / DXGI backend bound to one output window.
pub struct D3D11Gpu {
    factory: IDXGIFactory1,
    hwnd: HWND,
}

impl D3D11Gpu {
    pub fn new(hwnd: HWND) -> Result<Self, BackendError> {
        let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1()? };
        Ok(Self { factory, hwnd })
    }

    /// Maps a snapshot entry back to a live adapter, refusing if the
    /// enumeration order changed since the snapshot was taken.
    fn resolve_adapter(&self, adapter: &AdapterInfo) -> Result<IDXGIAdapter, BackendError> {
        let resolved = unsafe { self.factory.EnumAdapters1(adapter.index as u32)? };
        let desc = unsafe { resolved.GetDesc1()? };

        if pack_luid(desc.AdapterLuid.HighPart, desc.AdapterLuid.LowPart) != adapter.luid {
            return Err(format!("adapter '{}' is no longer at index {}", adapter.name, adapter.index).into());
        }

        Ok(resolved.cast()?)
    }
}

impl Gpu for D3D11Gpu {
    type Device = D3D11Device;
    type Texture = ID3D11Texture2D;
    type View = ID3D11RenderTargetView;
    type SwapChain = IDXGISwapChain;

    fn create_device(&self, adapter: &AdapterInfo) -> Result<D3D11Device, BackendError> {
        let dxgi_adapter = self.resolve_adapter(adapter)?;

        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        let feature_levels = [D3D_FEATURE_LEVEL_11_0];

        unsafe {
            D3D11CreateDevice(
                &dxgi_adapter,
                D3D_DRIVER_TYPE_UNKNOWN,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_FLAG(0),
                Some(&feature_levels),
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )?;
        }

        Ok(D3D11Device {
            device: device.ok_or(MissingObject("ID3D11Device"))?,
            context: context.ok_or(MissingObject("ID3D11DeviceContext"))?,
        })
    }

    fn create_swap_chain(&self, device: &D3D11Device, size: Extent, mode: WindowMode) -> Result<IDXGISwapChain, BackendError> {
        // The swap chain must come from the factory that owns the display adapter
        let dxgi_device: IDXGIDevice = device.device.cast()?;
        let dxgi_adapter = unsafe { dxgi_device.GetAdapter()? };
        let dxgi_factory: IDXGIFactory = unsafe { dxgi_adapter.GetParent()? };

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: size.width,
                Height: size.height,
                RefreshRate: DXGI_RATIONAL { Numerator: 60, Denominator: 1 },
                Format: SURFACE_FORMAT,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 2,
            OutputWindow: self.hwnd,
            Windowed: true.into(),
            SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
            Flags: 0,
        };

        let mut swap_chain: Option<IDXGISwapChain> = None;
        unsafe {
            dxgi_factory
                .CreateSwapChain(&device.device, &swap_chain_desc, &mut swap_chain)
                .ok()?;
        }
        let swap_chain = swap_chain.ok_or(MissingObject("IDXGISwapChain"))?;

        if mode == WindowMode::Borderless {
            // The popup already covers the output; Alt+Enter would fight it
            unsafe { dxgi_factory.MakeWindowAssociation(self.hwnd, DXGI_MWA_NO_ALT_ENTER)? };
            log_info!("Alt+Enter fullscreen transitions disabled for borderless window");
        }

        Ok(swap_chain)
    }

    fn create_shareable_texture(&self, device: &D3D11Device, size: Extent) -> Result<ID3D11Texture2D, BackendError> {
        let texture_desc = D3D11_TEXTURE2D_DESC {
            Width: size.width,
            Height: size.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: SURFACE_FORMAT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_RENDER_TARGET.0 as u32 | D3D11_BIND_SHADER_RESOURCE.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: D3D11_RESOURCE_MISC_SHARED.0 as u32,
        };

        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { device.device.CreateTexture2D(&texture_desc, None, Some(&mut texture))? };
        Ok(texture.ok_or(MissingObject("ID3D11Texture2D"))?)
    }

    fn create_render_target_view(&self, device: &D3D11Device, texture: &ID3D11Texture2D) -> Result<ID3D11RenderTargetView, BackendError> {
        let mut rtv: Option<ID3D11RenderTargetView> = None;
        unsafe { device.device.CreateRenderTargetView(texture, None, Some(&mut rtv))? };
        Ok(rtv.ok_or(MissingObject("ID3D11RenderTargetView"))?)
    }

    fn shared_handle(&self, texture: &ID3D11Texture2D) -> Result<Option<SharedHandle>, BackendError> {
        let resource: IDXGIResource = texture.cast()?;
        let handle = unsafe { resource.GetSharedHandle()? };

        if handle.0.is_null() {
            return Ok(None);
        }
        Ok(Some(SharedHandle(handle.0 as usize)))
    }

    fn open_shared_texture(&self, device: &D3D11Device, handle: SharedHandle) -> Result<ID3D11Texture2D, BackendError> {
        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { device.device.OpenSharedResource(HANDLE(handle.0 as *mut _), &mut texture)? };
        Ok(texture.ok_or(MissingObject("shared ID3D11Texture2D"))?)
    }

    fn texture_size(&self, texture: &ID3D11Texture2D) -> Extent {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };
        Extent::new(desc.Width, desc.Height)
    }

    fn back_buffer(&self, swap_chain: &IDXGISwapChain) -> Result<ID3D11Texture2D, BackendError> {
        let back_buffer: ID3D11Texture2D = unsafe { swap_chain.GetBuffer(0)? };
        Ok(back_buffer)
    }

    fn resize_buffers(&self, swap_chain: &IDXGISwapChain, size: Extent) -> Result<(), BackendError> {
        unsafe {
            swap_chain.ResizeBuffers(0, size.width, size.height, DXGI_FORMAT_UNKNOWN, DXGI_SWAP_CHAIN_FLAG(0))?;
        }
        Ok(())
    }

    fn clear(&self, device: &D3D11Device, view: &ID3D11RenderTargetView, color: [f32; 4]) {
        unsafe {
            device.context.OMSetRenderTargets(Some(&[Some(view.clone())]), None);
            device.context.ClearRenderTargetView(view, &color);
        }
    }

    fn flush(&self, device: &D3D11Device) {
        unsafe { device.context.Flush() };
    }

    fn copy_texture(&self, device: &D3D11Device, dst: &ID3D11Texture2D, src: &ID3D11Texture2D) {
        unsafe { device.context.CopyResource(dst, src) };
    }

    fn present(&self, swap_chain: &IDXGISwapChain, interval: PresentInterval) -> Result<(), BackendError> {
        unsafe { swap_chain.Present(interval.sync_interval(), DXGI_PRESENT(0)).ok()? };
        Ok(())
    }

    fn exit_fullscreen(&self, swap_chain: &IDXGISwapChain) {
        // A swap chain must not be released while in exclusive fullscreen
        let _ = unsafe { swap_chain.SetFullscreenState(false, None::<&IDXGIOutput>) };
    }
}
