/*!
 * Win32 Window System
 *
 * `WindowSystem` backed by user32: style reads/writes through
 * GetWindowLongW/SetWindowLongW, reparenting through SetParent, placement
 * through MoveWindow/SetWindowPos and input through PostMessageW.
 *
 * Windows belong to other processes, so every call re-checks `IsWindow`
 * and reports a vanished window as `StaleHandle` rather than a failure.
 */

use std::ffi::c_void;

use tracing::{debug, warn};
use windows::core::HSTRING;
use windows::Win32::Foundation::{HWND, LPARAM, POINT, RECT, TRUE, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VkKeyScanW, VK_LBUTTON};
use windows::Win32::UI::WindowsAndMessaging::{
    GetAncestor, GetCursorPos, GetDesktopWindow, GetWindowLongW, GetWindowRect,
    GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, IsChild, IsWindow,
    IsWindowVisible, MoveWindow, PostMessageW, SetParent, SetWindowLongW, SetWindowPos,
    SetWindowTextW, ShowWindow, WindowFromPoint, GA_PARENT, GWL_STYLE, SWP_FRAMECHANGED,
    SWP_NOZORDER, SW_RESTORE, SW_SHOW,
};

use crate::error::CaptureError;
use crate::platform::{
    BoundsMode, NativeMessage, Point, Rect, ShowCommand, WindowHandle, WindowStyle, WindowSystem,
};

pub(crate) fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

pub(crate) fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// user32-backed window system for the current desktop
#[derive(Debug, Default)]
pub struct Win32WindowSystem;

impl Win32WindowSystem {
    pub fn new() -> Self {
        Self
    }

    fn live(&self, handle: WindowHandle) -> Result<HWND, CaptureError> {
        if handle.0 == 0 || !self.is_window(handle) {
            return Err(CaptureError::StaleHandle(handle));
        }
        Ok(to_hwnd(handle))
    }

    /// Map a failed call to `StaleHandle` if the window vanished meanwhile
    fn failure(
        &self,
        handle: WindowHandle,
        operation: &'static str,
        error: impl std::fmt::Display,
    ) -> CaptureError {
        if self.is_window(handle) {
            CaptureError::mutation(handle, operation, error.to_string())
        } else {
            CaptureError::StaleHandle(handle)
        }
    }
}

impl WindowSystem for Win32WindowSystem {
    fn is_window(&self, handle: WindowHandle) -> bool {
        handle.0 != 0 && unsafe { IsWindow(to_hwnd(handle)) }.as_bool()
    }

    fn is_visible(&self, handle: WindowHandle) -> bool {
        self.is_window(handle) && unsafe { IsWindowVisible(to_hwnd(handle)) }.as_bool()
    }

    fn title(&self, handle: WindowHandle) -> Result<String, CaptureError> {
        let hwnd = self.live(handle)?;
        unsafe {
            let len = GetWindowTextLengthW(hwnd);
            if len <= 0 {
                return Ok(String::new());
            }
            let mut buf: Vec<u16> = vec![0; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buf);
            Ok(String::from_utf16_lossy(&buf[..copied.max(0) as usize]))
        }
    }

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<(), CaptureError> {
        let hwnd = self.live(handle)?;
        unsafe { SetWindowTextW(hwnd, &HSTRING::from(title)) }
            .map_err(|e| self.failure(handle, "SetWindowTextW", e))
    }

    fn process_id(&self, handle: WindowHandle) -> Result<u32, CaptureError> {
        let hwnd = self.live(handle)?;
        let mut pid = 0u32;
        let thread = unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
        if thread == 0 {
            return Err(self.failure(handle, "GetWindowThreadProcessId", "no owning thread"));
        }
        Ok(pid)
    }

    fn style(&self, handle: WindowHandle) -> Result<WindowStyle, CaptureError> {
        let hwnd = self.live(handle)?;
        Ok(WindowStyle(unsafe { GetWindowLongW(hwnd, GWL_STYLE) } as u32))
    }

    fn set_style(&self, handle: WindowHandle, style: WindowStyle) -> Result<(), CaptureError> {
        let hwnd = self.live(handle)?;
        unsafe { SetWindowLongW(hwnd, GWL_STYLE, style.0 as i32) };

        // SetWindowLongW returns the previous value, so verify by reading back
        let applied = self.style(handle)?;
        if applied.0 & !WindowStyle::VISIBLE != style.0 & !WindowStyle::VISIBLE {
            return Err(self.failure(
                handle,
                "SetWindowLongW",
                format!("style is {} after writing {}", applied, style),
            ));
        }
        Ok(())
    }

    fn parent(&self, handle: WindowHandle) -> Result<Option<WindowHandle>, CaptureError> {
        let hwnd = self.live(handle)?;
        let parent = unsafe { GetAncestor(hwnd, GA_PARENT) };
        if parent.is_invalid() || parent == unsafe { GetDesktopWindow() } {
            Ok(None)
        } else {
            Ok(Some(from_hwnd(parent)))
        }
    }

    fn set_parent(
        &self,
        handle: WindowHandle,
        parent: Option<WindowHandle>,
    ) -> Result<(), CaptureError> {
        let hwnd = self.live(handle)?;
        let new_parent = parent.map(to_hwnd).unwrap_or_default();
        unsafe { SetParent(hwnd, new_parent) }
            .map(|_| ())
            .map_err(|e| self.failure(handle, "SetParent", e))
    }

    fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), CaptureError> {
        let hwnd = self.live(handle)?;
        let cmd = match command {
            ShowCommand::Show => SW_SHOW,
            ShowCommand::Restore => SW_RESTORE,
        };
        // Return value is the previous visibility, not an error indicator
        let _ = unsafe { ShowWindow(hwnd, cmd) };
        Ok(())
    }

    fn set_bounds(
        &self,
        handle: WindowHandle,
        bounds: Rect,
        mode: BoundsMode,
    ) -> Result<(), CaptureError> {
        let hwnd = self.live(handle)?;
        let (w, h) = (bounds.width as i32, bounds.height as i32);
        let result = unsafe {
            match mode {
                BoundsMode::Embedded => MoveWindow(hwnd, bounds.x, bounds.y, w, h, TRUE),
                BoundsMode::TopLevel => SetWindowPos(
                    hwnd,
                    HWND::default(),
                    bounds.x,
                    bounds.y,
                    w,
                    h,
                    SWP_NOZORDER | SWP_FRAMECHANGED,
                ),
            }
        };
        result.map_err(|e| self.failure(handle, "SetWindowPos", e))
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<Rect, CaptureError> {
        let hwnd = self.live(handle)?;
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }
            .map_err(|e| self.failure(handle, "GetWindowRect", e))?;
        Ok(Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn is_descendant(&self, ancestor: WindowHandle, handle: WindowHandle) -> bool {
        self.is_window(ancestor)
            && self.is_window(handle)
            && unsafe { IsChild(to_hwnd(ancestor), to_hwnd(handle)) }.as_bool()
    }

    fn cursor_position(&self) -> Result<Point, CaptureError> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| CaptureError::DetectorFault(format!("GetCursorPos failed: {}", e)))?;
        Ok(Point::new(point.x, point.y))
    }

    fn primary_button_down(&self) -> bool {
        unsafe { GetAsyncKeyState(VK_LBUTTON.0 as i32) } < 0
    }

    fn window_at(&self, point: Point) -> Option<WindowHandle> {
        let hwnd = unsafe { WindowFromPoint(POINT { x: point.x, y: point.y }) };
        if hwnd.is_invalid() {
            None
        } else {
            Some(from_hwnd(hwnd))
        }
    }

    fn post_message(
        &self,
        handle: WindowHandle,
        message: NativeMessage,
    ) -> Result<(), CaptureError> {
        let hwnd = self.live(handle)?;
        unsafe {
            PostMessageW(
                hwnd,
                message.id,
                WPARAM(message.wparam),
                LPARAM(message.lparam),
            )
        }
        .map_err(|e| {
            warn!("PostMessageW(0x{:04X}) to {} failed: {}", message.id, handle, e);
            self.failure(handle, "PostMessageW", e)
        })
    }

    fn virtual_key_for_char(&self, ch: char) -> Option<u16> {
        let mut units = [0u16; 2];
        let encoded = ch.encode_utf16(&mut units);
        if encoded.len() != 1 {
            return None;
        }
        let scan = unsafe { VkKeyScanW(encoded[0]) };
        if scan == -1 {
            debug!("No virtual key for {:?} in the active layout", ch);
            return None;
        }
        // Low byte is the key, high byte the shift state
        Some((scan as u16) & 0x00FF)
    }
}
