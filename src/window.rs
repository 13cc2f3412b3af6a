//! Win32 window the session presents into, and its [`EventPump`].

use crate::error::SessionError;
use crate::gpu::Extent;
use crate::session::render_loop::{FPS_PRESETS, FPS_STEP, SIZE_STEP_PERCENT};
use crate::session::{EventPump, SessionConfig, WindowEvent};
use crate::settings::WindowMode;
use crate::{log_info, log_warn};
use std::cell::RefCell;
use std::collections::VecDeque;

use windows::{
    core::{w, HSTRING},
    Win32::{
        Foundation::*,
        Graphics::Gdi::HBRUSH,
        System::LibraryLoader::GetModuleHandleW,
        UI::Input::KeyboardAndMouse::{
            VK_ADD, VK_DOWN, VK_ESCAPE, VK_OEM_MINUS, VK_OEM_PLUS, VK_SPACE, VK_SUBTRACT, VK_UP,
        },
        UI::WindowsAndMessaging::*,
    },
};

type EventQueue = RefCell<VecDeque<WindowEvent>>;

pub struct RenderWindow {
    hwnd: HWND,
    // Boxed so the pointer stored in GWLP_USERDATA stays put
    events: Box<EventQueue>,
}

impl RenderWindow {
    pub fn create(config: &SessionConfig) -> Result<Self, SessionError> {
        unsafe { Self::create_window(config) }.map_err(|e| SessionError::Window(e.into()))
    }

    unsafe fn create_window(config: &SessionConfig) -> windows::core::Result<Self> {
        let class_name = w!("CustomFpsRenderWindow");
        let hinstance = GetModuleHandleW(None)?;

        let wc = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: class_name,
            hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
            hbrBackground: HBRUSH::default(),
            style: CS_HREDRAW | CS_VREDRAW,
            ..Default::default()
        };

        // Fails harmlessly when a previous session already registered the class
        RegisterClassW(&wc);

        let bounds = config.selection.output().bounds;
        let (style, x, y, width, height) = match config.mode {
            WindowMode::Borderless => (
                WS_POPUP,
                bounds.left,
                bounds.top,
                bounds.right - bounds.left,
                bounds.bottom - bounds.top,
            ),
            WindowMode::Windowed => {
                let mut rect = RECT {
                    left: 0,
                    top: 0,
                    right: config.size.width as i32,
                    bottom: config.size.height as i32,
                };
                AdjustWindowRect(&mut rect, WS_OVERLAPPEDWINDOW, false)?;
                let width = rect.right - rect.left;
                let height = rect.bottom - rect.top;
                let output = bounds.extent();
                (
                    WS_OVERLAPPEDWINDOW,
                    bounds.left + (output.width as i32 - width).max(0) / 2,
                    bounds.top + (output.height as i32 - height).max(0) / 2,
                    width,
                    height,
                )
            }
        };

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class_name,
            w!("CustomFPS"),
            style,
            x, y, width, height,
            None, None,
            Some(HINSTANCE(hinstance.0)),
            None,
        )?;

        let events: Box<EventQueue> = Box::default();
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*events as *const EventQueue as isize);

        log_info!("Keys: Esc settings, Space pause, Up/Down fps, 1-4 fps presets, +/- size");

        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = SetForegroundWindow(hwnd);

        log_info!(
            "Render window created at ({}, {}) {}x{} ({})",
            x, y, width, height,
            config.mode.label()
        );

        Ok(Self { hwnd, events })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

}

impl EventPump for RenderWindow {
    fn poll_event(&mut self) -> Option<WindowEvent> {
        let queued = self.events.borrow_mut().pop_front();
        if queued.is_some() {
            return queued;
        }

        let mut msg = MSG::default();
        unsafe {
            if !PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                return None;
            }
            if msg.message == WM_QUIT {
                return Some(WindowEvent::Close);
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        let dispatched = self.events.borrow_mut().pop_front();
        Some(dispatched.unwrap_or(WindowEvent::Other))
    }

    fn set_status(&mut self, status: &str) {
        let _ = unsafe { SetWindowTextW(self.hwnd, &HSTRING::from(status)) };
    }

    /// WM_SIZE arrives synchronously from SetWindowPos, so the matching
    /// `Resized` is queued before this returns.
    fn resize_window(&mut self, size: Extent) {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: size.width as i32,
            bottom: size.height as i32,
        };
        let result = unsafe {
            let style = WINDOW_STYLE(GetWindowLongW(self.hwnd, GWL_STYLE) as u32);
            AdjustWindowRect(&mut rect, style, false).and_then(|_| {
                SetWindowPos(
                    self.hwnd,
                    None,
                    0, 0,
                    rect.right - rect.left,
                    rect.bottom - rect.top,
                    SWP_NOMOVE | SWP_NOZORDER | SWP_NOACTIVATE,
                )
            })
        };
        if let Err(e) = result {
            log_warn!("Could not resize render window to {}: {}", size, e);
        }
    }
}

impl Drop for RenderWindow {
    fn drop(&mut self) {
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            let _ = DestroyWindow(self.hwnd);
        }
        log_info!("Render window destroyed");
    }
}

/// Esc and Space ignore auto-repeat; the fps and size keys repeat while held.
fn key_event(key: u16, repeat: bool) -> Option<WindowEvent> {
    let fps_step = FPS_STEP as i32;
    match key {
        k if k == VK_ESCAPE.0 && !repeat => Some(WindowEvent::ReturnToSettings),
        k if k == VK_SPACE.0 && !repeat => Some(WindowEvent::TogglePause),
        k @ 0x31..=0x34 if !repeat => Some(WindowEvent::SetTargetFps(FPS_PRESETS[(k - 0x31) as usize])),
        k if k == VK_UP.0 => Some(WindowEvent::AdjustTargetFps(fps_step)),
        k if k == VK_DOWN.0 => Some(WindowEvent::AdjustTargetFps(-fps_step)),
        k if k == VK_OEM_PLUS.0 || k == VK_ADD.0 => Some(WindowEvent::ScaleSize(SIZE_STEP_PERCENT)),
        k if k == VK_OEM_MINUS.0 || k == VK_SUBTRACT.0 => Some(WindowEvent::ScaleSize(-SIZE_STEP_PERCENT)),
        _ => None,
    }
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let event = match msg {
        WM_SIZE => {
            let size = Extent::new((lparam.0 & 0xFFFF) as u32, ((lparam.0 >> 16) & 0xFFFF) as u32);
            if wparam.0 as u32 == SIZE_MINIMIZED || size.is_empty() {
                None
            } else {
                Some(WindowEvent::Resized(size))
            }
        }
        WM_CLOSE => Some(WindowEvent::Close),
        // Bit 30 is set for auto-repeat
        WM_KEYDOWN => key_event(wparam.0 as u16, (lparam.0 >> 30) & 1 != 0),
        _ => None,
    };

    if let Some(event) = event {
        let queue = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const EventQueue;
        if let Some(queue) = queue.as_ref() {
            if let Ok(mut queue) = queue.try_borrow_mut() {
                queue.push_back(event);
            }
        }
    }

    match msg {
        // The loop decides when the window goes away
        WM_CLOSE => LRESULT(0),
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
