/*!
 * Win32 Host Shell
 *
 * Owns the host top-level window and one child container window per slot.
 * Window procedures only queue notifications on a thread-local queue;
 * `poll_events` pumps the message queue, applies layout changes and turns
 * the notifications into `ShellEvent`s for the engine.
 */

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, RECT, TRUE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateSolidBrush, DeleteObject, EndPaint, FillRect, InvalidateRect, PAINTSTRUCT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetFocus, GetKeyState, SetFocus, VK_CONTROL, VK_SHIFT};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect, GetWindow, LoadCursorW,
    MoveWindow, PeekMessageW, RegisterClassW, SetWindowPos, ShowWindow, TranslateMessage,
    CS_HREDRAW, CS_VREDRAW, GW_CHILD, HWND_NOTOPMOST, HWND_TOPMOST, IDC_ARROW, MSG, PM_REMOVE, SWP_NOACTIVATE,
    SWP_NOMOVE, SWP_NOSIZE, SW_HIDE, SW_SHOW, WINDOW_EX_STYLE, WM_CHAR, WM_CLOSE, WM_ERASEBKGND,
    WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEACTIVATE,
    WM_MOUSEMOVE, WM_PAINT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SIZE, WNDCLASSW, WNDPROC, WS_CHILD,
    WS_CLIPCHILDREN, WS_OVERLAPPEDWINDOW, WS_VISIBLE,
};

use super::{apply_shortcut, Shortcut, ShortcutAction};
use crate::config::GrouperConfig;
use crate::error::CaptureError;
use crate::input::keys::{key_for_virtual_key, MK_LBUTTON, MK_MBUTTON, MK_RBUTTON};
use crate::input::{InputEvent, Key, MouseButton, MouseButtons};
use crate::layout::{Container, LayoutShell, ShellEvent, SlotId, SlotLayout};
use crate::platform::win32::from_hwnd;
use crate::platform::{Point, Size, WindowHandle};

const HOST_CLASS: PCWSTR = w!("WindowGrouperHost");
const CONTAINER_CLASS: PCWSTR = w!("WindowGrouperContainer");

const MA_ACTIVATE: isize = 1;
/// Background colours (0x00BBGGRR)
const IDLE_COLOR: COLORREF = COLORREF(0x00F0_F0F0);
const DROP_COLOR: COLORREF = COLORREF(0x00FF_E5CC);

/// Notification queued by a window procedure
#[derive(Debug)]
enum Notice {
    HostResized,
    HostClosing,
    Shortcut(Shortcut),
    ContainerResized(WindowHandle),
    ContainerInput(WindowHandle, InputEvent),
}

thread_local! {
    static NOTICES: RefCell<VecDeque<Notice>> = RefCell::new(VecDeque::new());
    static HIGHLIGHT: Cell<bool> = Cell::new(false);
}

fn notify(notice: Notice) {
    NOTICES.with(|queue| queue.borrow_mut().push_back(notice));
}

fn take_notices() -> Vec<Notice> {
    NOTICES.with(|queue| queue.borrow_mut().drain(..).collect())
}

fn key_down(vk: u16) -> bool {
    unsafe { GetKeyState(vk as i32) } < 0
}

/// Ctrl shortcuts work in both the host and its containers
fn shortcut_for(wparam: WPARAM) -> Option<Shortcut> {
    if !key_down(VK_CONTROL.0) {
        return None;
    }
    Shortcut::from_key(wparam.0 as u16, key_down(VK_SHIFT.0))
}

fn point_from_lparam(lparam: LPARAM) -> Point {
    let x = (lparam.0 & 0xFFFF) as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;
    Point::new(x, y)
}

fn buttons_from_wparam(wparam: WPARAM) -> MouseButtons {
    MouseButtons {
        left: wparam.0 & MK_LBUTTON != 0,
        right: wparam.0 & MK_RBUTTON != 0,
        middle: wparam.0 & MK_MBUTTON != 0,
    }
}

unsafe extern "system" fn host_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_SIZE => {
            notify(Notice::HostResized);
            LRESULT(0)
        }
        // Closing is decided by the engine once every window is restored
        WM_CLOSE => {
            notify(Notice::HostClosing);
            LRESULT(0)
        }
        WM_KEYDOWN => match shortcut_for(wparam) {
            Some(shortcut) => {
                notify(Notice::Shortcut(shortcut));
                LRESULT(0)
            }
            None => DefWindowProcW(hwnd, msg, wparam, lparam),
        },
        WM_ERASEBKGND => LRESULT(1),
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = BeginPaint(hwnd, &mut ps);
            let color = if HIGHLIGHT.with(Cell::get) {
                DROP_COLOR
            } else {
                IDLE_COLOR
            };
            let brush = CreateSolidBrush(color);
            FillRect(hdc, &ps.rcPaint, brush);
            let _ = DeleteObject(brush);
            let _ = EndPaint(hwnd, &ps);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe extern "system" fn container_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let surface = from_hwnd(hwnd);
    let mouse = |button: MouseButton, pressed: bool| {
        let position = point_from_lparam(lparam);
        let held = buttons_from_wparam(wparam);
        let event = if pressed {
            InputEvent::MousePress {
                button,
                position,
                held,
            }
        } else {
            InputEvent::MouseRelease {
                button,
                position,
                held,
            }
        };
        notify(Notice::ContainerInput(surface, event));
        LRESULT(0)
    };

    match msg {
        WM_SIZE => {
            notify(Notice::ContainerResized(surface));
            LRESULT(0)
        }
        WM_MOUSEACTIVATE => {
            let _ = SetFocus(hwnd);
            LRESULT(MA_ACTIVATE)
        }
        WM_LBUTTONDOWN => mouse(MouseButton::Left, true),
        WM_LBUTTONUP => mouse(MouseButton::Left, false),
        WM_RBUTTONDOWN => mouse(MouseButton::Right, true),
        WM_RBUTTONUP => mouse(MouseButton::Right, false),
        WM_MBUTTONDOWN => mouse(MouseButton::Middle, true),
        WM_MBUTTONUP => mouse(MouseButton::Middle, false),
        WM_MOUSEMOVE => {
            notify(Notice::ContainerInput(
                surface,
                InputEvent::MouseMove {
                    position: point_from_lparam(lparam),
                    held: buttons_from_wparam(wparam),
                },
            ));
            LRESULT(0)
        }
        WM_KEYDOWN => {
            if let Some(shortcut) = shortcut_for(wparam) {
                notify(Notice::Shortcut(shortcut));
            } else if let Some(key) = key_for_virtual_key(wparam.0 as u16) {
                notify(Notice::ContainerInput(
                    surface,
                    InputEvent::KeyPress {
                        key,
                        text: String::new(),
                    },
                ));
            }
            LRESULT(0)
        }
        // Printable text arrives here once TranslateMessage has run
        WM_CHAR => {
            let ch = char::from_u32(wparam.0 as u32).filter(|c| !c.is_control());
            if let (Some(ch), false) = (ch, key_down(VK_CONTROL.0)) {
                notify(Notice::ContainerInput(
                    surface,
                    InputEvent::KeyPress {
                        key: Key::Other,
                        text: ch.to_string(),
                    },
                ));
            }
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn register_classes() -> Result<()> {
    unsafe {
        let instance = GetModuleHandleW(None).context("GetModuleHandleW failed")?;
        let cursor = LoadCursorW(None, IDC_ARROW).context("LoadCursorW failed")?;

        let classes: [(PCWSTR, WNDPROC); 2] = [
            (HOST_CLASS, Some(host_wndproc)),
            (CONTAINER_CLASS, Some(container_wndproc)),
        ];
        for (name, wndproc) in classes {
            let class = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: wndproc,
                hInstance: instance.into(),
                hCursor: cursor,
                lpszClassName: name,
                ..Default::default()
            };
            // Zero also means "already registered" on a second shell
            if RegisterClassW(&class) == 0 {
                debug!("RegisterClassW returned 0 for a grouper class");
            }
        }
    }
    Ok(())
}

/// Win32 implementation of `LayoutShell`
pub struct Win32Shell {
    host: HWND,
    containers: BTreeMap<SlotId, HWND>,
    layout: SlotLayout,
    next_slot: u32,
    always_on_top: bool,
}

impl Win32Shell {
    /// Create and show the host window described by `config`
    pub fn create(config: &GrouperConfig) -> Result<Self> {
        register_classes()?;
        let rect = config.host_rect;
        let host = unsafe {
            let instance = GetModuleHandleW(None)?;
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                HOST_CLASS,
                &HSTRING::from(config.host_title.as_str()),
                WS_OVERLAPPEDWINDOW | WS_VISIBLE | WS_CLIPCHILDREN,
                rect.x,
                rect.y,
                rect.width as i32,
                rect.height as i32,
                None,
                None,
                instance,
                None,
            )
            .context("Failed to create host window")?
        };

        let mut shell = Self {
            host,
            containers: BTreeMap::new(),
            layout: SlotLayout::new(config.layout_mode),
            next_slot: 1,
            always_on_top: false,
        };
        shell.set_always_on_top(config.always_on_top);
        info!(
            "Host window {} created ({:?} layout)",
            from_hwnd(host),
            config.layout_mode
        );
        Ok(shell)
    }

    fn set_always_on_top(&mut self, enabled: bool) {
        let order = if enabled { HWND_TOPMOST } else { HWND_NOTOPMOST };
        let result = unsafe {
            SetWindowPos(
                self.host,
                order,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        };
        match result {
            Ok(()) => {
                self.always_on_top = enabled;
                info!("Always on top: {}", enabled);
            }
            Err(e) => warn!("Changing always-on-top failed: {}", e),
        }
    }

    fn client_size(hwnd: HWND) -> Option<Size> {
        let mut rect = RECT::default();
        unsafe { GetClientRect(hwnd, &mut rect) }.ok()?;
        Some(Size::new(
            (rect.right - rect.left).max(0) as u32,
            (rect.bottom - rect.top).max(0) as u32,
        ))
    }

    /// Show visible containers at their layout rectangles, hide the rest
    fn relayout(&self) {
        let Some(client) = Self::client_size(self.host) else {
            return;
        };
        let visible = self.layout.visible_rects(client);
        for (slot, hwnd) in &self.containers {
            match visible.iter().find(|(s, _)| s == slot) {
                Some((_, rect)) => unsafe {
                    let _ = MoveWindow(
                        *hwnd,
                        rect.x,
                        rect.y,
                        rect.width as i32,
                        rect.height as i32,
                        TRUE,
                    );
                    let _ = ShowWindow(*hwnd, SW_SHOW);
                },
                None => unsafe {
                    let _ = ShowWindow(*hwnd, SW_HIDE);
                },
            }
        }
    }

    fn slot_for(&self, surface: WindowHandle) -> Option<SlotId> {
        self.containers
            .iter()
            .find(|(_, hwnd)| from_hwnd(**hwnd) == surface)
            .map(|(slot, _)| *slot)
    }

    fn focused_slot(&self) -> Option<SlotId> {
        let focus = unsafe { GetFocus() };
        self.slot_for(from_hwnd(focus))
    }

    fn pump_messages() {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

impl LayoutShell for Win32Shell {
    fn host_window(&self) -> WindowHandle {
        from_hwnd(self.host)
    }

    fn create_container(&mut self) -> Result<Container, CaptureError> {
        let hwnd = unsafe {
            let instance =
                GetModuleHandleW(None).map_err(|e| CaptureError::Shell(e.to_string()))?;
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                CONTAINER_CLASS,
                None,
                WS_CHILD | WS_CLIPCHILDREN,
                0,
                0,
                0,
                0,
                self.host,
                None,
                instance,
                None,
            )
            .map_err(|e| CaptureError::Shell(format!("CreateWindowExW failed: {}", e)))?
        };
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        self.containers.insert(slot, hwnd);
        debug!("Container {} created for slot {}", from_hwnd(hwnd), slot);
        Ok(Container {
            slot,
            surface: from_hwnd(hwnd),
        })
    }

    fn attach(&mut self, slot: SlotId, title: &str) -> Result<(), CaptureError> {
        if !self.containers.contains_key(&slot) {
            return Err(CaptureError::UnknownSlot(slot));
        }
        self.layout.insert(slot);
        self.relayout();
        info!("Slot {} shows \"{}\" ({} slots)", slot, title, self.layout.len());
        Ok(())
    }

    fn detach(&mut self, slot: SlotId) {
        self.layout.remove(slot);
        if let Some(hwnd) = self.containers.remove(&slot) {
            if let Err(e) = unsafe { DestroyWindow(hwnd) } {
                warn!("Destroying container for slot {} failed: {}", slot, e);
            }
        }
        self.relayout();
    }

    fn container_size(&self, slot: SlotId) -> Option<Size> {
        self.containers
            .get(&slot)
            .and_then(|hwnd| Self::client_size(*hwnd))
    }

    fn set_drop_highlight(&mut self, active: bool) {
        if HIGHLIGHT.with(|h| h.replace(active)) != active {
            unsafe {
                let _ = InvalidateRect(self.host, None, TRUE);
            }
        }
    }

    fn poll_events(&mut self) -> Vec<ShellEvent> {
        Self::pump_messages();

        let mut events = Vec::new();
        // Relayout resizes containers, which queues more notices
        for _ in 0..4 {
            let notices = take_notices();
            if notices.is_empty() {
                break;
            }
            for notice in notices {
                match notice {
                    Notice::HostResized => self.relayout(),
                    Notice::HostClosing => events.push(ShellEvent::Quit),
                    Notice::Shortcut(shortcut) => {
                        match apply_shortcut(&mut self.layout, shortcut, self.focused_slot()) {
                            ShortcutAction::Relayout => self.relayout(),
                            ShortcutAction::Close(slot) => events.push(ShellEvent::CloseSlot(slot)),
                            ShortcutAction::ToggleAlwaysOnTop => {
                                self.set_always_on_top(!self.always_on_top)
                            }
                            ShortcutAction::Nothing => {}
                        }
                    }
                    Notice::ContainerResized(surface) => {
                        if let Some(slot) = self.slot_for(surface) {
                            events.push(ShellEvent::Resized(slot));
                        }
                    }
                    Notice::ContainerInput(surface, event) => {
                        if let Some(slot) = self.slot_for(surface) {
                            events.push(ShellEvent::Input { slot, event });
                        }
                    }
                }
            }
        }
        events
    }
}

impl Drop for Win32Shell {
    fn drop(&mut self) {
        // Destroying a container destroys whatever is still parented to it
        let mut occupied = 0;
        for (slot, hwnd) in &self.containers {
            let child = unsafe { GetWindow(*hwnd, GW_CHILD) }
                .ok()
                .filter(|c| !c.is_invalid());
            if let Some(child) = child {
                warn!(
                    "Slot {} still holds {}, leaving its container in place",
                    slot,
                    from_hwnd(child)
                );
                occupied += 1;
                continue;
            }
            unsafe {
                let _ = DestroyWindow(*hwnd);
            }
        }
        if occupied > 0 {
            warn!(
                "Host window {} kept alive for {} embedded window(s)",
                from_hwnd(self.host),
                occupied
            );
            return;
        }
        unsafe {
            let _ = DestroyWindow(self.host);
        }
        Self::pump_messages();
        debug!("Host window {} destroyed", from_hwnd(self.host));
    }
}
