//! In-memory `Gpu` that journals every call and release.
//!
//! It enforces the driver rules the session relies on: buffers cannot be
//! resized while referenced, views only bind on the device that created them,
//! and copies only happen between same-device resources of equal size.
//! Violations are collected instead of panicking so tests can assert on them.

use super::{Extent, Gpu, PresentInterval, SharedHandle};
use crate::adapters::AdapterInfo;
use crate::error::BackendError;
use crate::settings::WindowMode;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handle {
    Device(u32),
    Texture(u32),
    View(u32),
    SwapChain(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDevice { adapter: usize, device: u32 },
    CreateSwapChain { device: u32, size: Extent, mode: WindowMode },
    CreateTexture { device: u32, texture: u32, size: Extent },
    CreateView { device: u32, view: u32, texture: u32 },
    QuerySharedHandle { texture: u32 },
    OpenShared { device: u32, texture: u32, size: Extent },
    BackBuffer { texture: u32, size: Extent },
    ResizeBuffers { size: Extent },
    Clear { device: u32, view: u32, size: Extent },
    Flush { device: u32 },
    Copy { device: u32, dst_size: Extent, src_size: Extent },
    Present { interval: PresentInterval },
    ExitFullscreen,
    Release(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateDevice(usize),
    CreateSwapChain,
    CreateTexture,
    CreateView,
    NullSharedHandle,
    OpenShared,
    ResizeBuffers,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureKind {
    Shareable,
    Imported,
    BackBuffer,
}

#[derive(Default)]
struct Journal {
    calls: Vec<Call>,
    next_id: u32,
    live: BTreeSet<Handle>,
    failures: HashSet<FailPoint>,
    violations: Vec<String>,
    shared: HashMap<usize, Extent>,
    back_buffer_size: Extent,
    back_buffer_refs: usize,
}

impl Journal {
    fn allocate(&mut self, make: fn(u32) -> Handle) -> u32 {
        self.next_id += 1;
        self.live.insert(make(self.next_id));
        self.next_id
    }

    fn release(&mut self, handle: Handle) {
        if !self.live.remove(&handle) {
            self.violations.push(format!("{:?} released twice", handle));
        }
        self.calls.push(Call::Release(handle));
    }

    fn check(&mut self, point: FailPoint) -> Result<(), BackendError> {
        if self.failures.contains(&point) {
            return Err(format!("injected failure at {:?}", point).into());
        }
        Ok(())
    }
}

type Shared = Rc<RefCell<Journal>>;

pub struct FakeDevice {
    pub id: u32,
    pub adapter: usize,
    journal: Shared,
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.journal.borrow_mut().release(Handle::Device(self.id));
    }
}

pub struct FakeTexture {
    pub id: u32,
    pub device: u32,
    pub size: Extent,
    kind: TextureKind,
    journal: Shared,
}

impl Drop for FakeTexture {
    fn drop(&mut self) {
        let mut journal = self.journal.borrow_mut();
        if self.kind == TextureKind::BackBuffer {
            journal.back_buffer_refs -= 1;
        }
        journal.release(Handle::Texture(self.id));
    }
}

pub struct FakeView {
    pub id: u32,
    pub device: u32,
    pub size: Extent,
    of_back_buffer: bool,
    journal: Shared,
}

impl Drop for FakeView {
    fn drop(&mut self) {
        let mut journal = self.journal.borrow_mut();
        if self.of_back_buffer {
            journal.back_buffer_refs -= 1;
        }
        journal.release(Handle::View(self.id));
    }
}

pub struct FakeSwapChain {
    pub id: u32,
    pub device: u32,
    journal: Shared,
}

impl Drop for FakeSwapChain {
    fn drop(&mut self) {
        self.journal.borrow_mut().release(Handle::SwapChain(self.id));
    }
}

/// Cheap to clone; clones share one journal so a test can keep a handle
/// while the session owns another.
#[derive(Clone, Default)]
pub struct RecordingGpu {
    journal: Shared,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, point: FailPoint) {
        self.journal.borrow_mut().failures.insert(point);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.journal.borrow_mut().calls.clear();
    }

    pub fn live(&self) -> BTreeSet<Handle> {
        self.journal.borrow().live.clone()
    }

    pub fn live_textures(&self) -> usize {
        self.live().iter().filter(|h| matches!(h, Handle::Texture(_))).count()
    }

    pub fn live_views(&self) -> usize {
        self.live().iter().filter(|h| matches!(h, Handle::View(_))).count()
    }

    pub fn violations(&self) -> Vec<String> {
        self.journal.borrow().violations.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.journal.borrow().calls.iter().filter(|c| matches(c)).count()
    }

    fn texture(&self, device: u32, size: Extent, kind: TextureKind) -> FakeTexture {
        let id = self.journal.borrow_mut().allocate(Handle::Texture);
        FakeTexture { id, device, size, kind, journal: Rc::clone(&self.journal) }
    }
}

impl Gpu for RecordingGpu {
    type Device = FakeDevice;
    type Texture = FakeTexture;
    type View = FakeView;
    type SwapChain = FakeSwapChain;

    fn create_device(&self, adapter: &AdapterInfo) -> Result<FakeDevice, BackendError> {
        let mut journal = self.journal.borrow_mut();
        journal.check(FailPoint::CreateDevice(adapter.index))?;
        let id = journal.allocate(Handle::Device);
        journal.calls.push(Call::CreateDevice { adapter: adapter.index, device: id });
        Ok(FakeDevice { id, adapter: adapter.index, journal: Rc::clone(&self.journal) })
    }

    fn create_swap_chain(&self, device: &FakeDevice, size: Extent, mode: WindowMode) -> Result<FakeSwapChain, BackendError> {
        let mut journal = self.journal.borrow_mut();
        journal.check(FailPoint::CreateSwapChain)?;
        let id = journal.allocate(Handle::SwapChain);
        journal.back_buffer_size = size;
        journal.calls.push(Call::CreateSwapChain { device: device.id, size, mode });
        Ok(FakeSwapChain { id, device: device.id, journal: Rc::clone(&self.journal) })
    }

    fn create_shareable_texture(&self, device: &FakeDevice, size: Extent) -> Result<FakeTexture, BackendError> {
        self.journal.borrow_mut().check(FailPoint::CreateTexture)?;
        let texture = self.texture(device.id, size, TextureKind::Shareable);
        self.journal.borrow_mut().calls.push(Call::CreateTexture { device: device.id, texture: texture.id, size });
        Ok(texture)
    }

    fn create_render_target_view(&self, device: &FakeDevice, texture: &FakeTexture) -> Result<FakeView, BackendError> {
        let mut journal = self.journal.borrow_mut();
        journal.check(FailPoint::CreateView)?;
        if texture.device != device.id {
            journal.violations.push(format!("view for texture {} created on foreign device {}", texture.id, device.id));
        }
        let of_back_buffer = texture.kind == TextureKind::BackBuffer;
        if of_back_buffer {
            journal.back_buffer_refs += 1;
        }
        let id = journal.allocate(Handle::View);
        journal.calls.push(Call::CreateView { device: device.id, view: id, texture: texture.id });
        Ok(FakeView { id, device: device.id, size: texture.size, of_back_buffer, journal: Rc::clone(&self.journal) })
    }

    fn shared_handle(&self, texture: &FakeTexture) -> Result<Option<SharedHandle>, BackendError> {
        let mut journal = self.journal.borrow_mut();
        journal.calls.push(Call::QuerySharedHandle { texture: texture.id });
        if journal.failures.contains(&FailPoint::NullSharedHandle) {
            return Ok(None);
        }
        if texture.kind != TextureKind::Shareable {
            return Err("texture was not created shareable".into());
        }
        let handle = 0x4000 + texture.id as usize;
        journal.shared.insert(handle, texture.size);
        Ok(Some(SharedHandle(handle)))
    }

    fn open_shared_texture(&self, device: &FakeDevice, handle: SharedHandle) -> Result<FakeTexture, BackendError> {
        let size = {
            let mut journal = self.journal.borrow_mut();
            journal.check(FailPoint::OpenShared)?;
            *journal.shared.get(&handle.0).ok_or("unknown shared handle")?
        };
        let texture = self.texture(device.id, size, TextureKind::Imported);
        self.journal.borrow_mut().calls.push(Call::OpenShared { device: device.id, texture: texture.id, size });
        Ok(texture)
    }

    fn texture_size(&self, texture: &FakeTexture) -> Extent {
        texture.size
    }

    fn back_buffer(&self, swap_chain: &FakeSwapChain) -> Result<FakeTexture, BackendError> {
        let size = {
            let mut journal = self.journal.borrow_mut();
            journal.back_buffer_refs += 1;
            journal.back_buffer_size
        };
        let texture = self.texture(swap_chain.device, size, TextureKind::BackBuffer);
        self.journal.borrow_mut().calls.push(Call::BackBuffer { texture: texture.id, size });
        Ok(texture)
    }

    fn resize_buffers(&self, _swap_chain: &FakeSwapChain, size: Extent) -> Result<(), BackendError> {
        let mut journal = self.journal.borrow_mut();
        journal.check(FailPoint::ResizeBuffers)?;
        if journal.back_buffer_refs > 0 {
            let refs = journal.back_buffer_refs;
            journal.violations.push(format!("resize to {} while {} buffer references alive", size, refs));
            return Err("swap chain buffers are still referenced".into());
        }
        journal.back_buffer_size = size;
        journal.calls.push(Call::ResizeBuffers { size });
        Ok(())
    }

    fn clear(&self, device: &FakeDevice, view: &FakeView, _color: [f32; 4]) {
        let mut journal = self.journal.borrow_mut();
        if view.device != device.id {
            journal.violations.push(format!("view {} bound on foreign device {}", view.id, device.id));
        }
        journal.calls.push(Call::Clear { device: device.id, view: view.id, size: view.size });
    }

    fn flush(&self, device: &FakeDevice) {
        self.journal.borrow_mut().calls.push(Call::Flush { device: device.id });
    }

    fn copy_texture(&self, device: &FakeDevice, dst: &FakeTexture, src: &FakeTexture) {
        let mut journal = self.journal.borrow_mut();
        if dst.device != device.id || src.device != device.id {
            journal.violations.push(format!("copy {} -> {} issued on device {}", src.id, dst.id, device.id));
        }
        if dst.size != src.size {
            journal.violations.push(format!("copy size mismatch {} -> {}", src.size, dst.size));
        }
        journal.calls.push(Call::Copy { device: device.id, dst_size: dst.size, src_size: src.size });
    }

    fn present(&self, _swap_chain: &FakeSwapChain, interval: PresentInterval) -> Result<(), BackendError> {
        let mut journal = self.journal.borrow_mut();
        journal.check(FailPoint::Present)?;
        journal.calls.push(Call::Present { interval });
        Ok(())
    }

    fn exit_fullscreen(&self, _swap_chain: &FakeSwapChain) {
        self.journal.borrow_mut().calls.push(Call::ExitFullscreen);
    }
}
