//! In-memory desktop used by unit tests.
//!
//! Windows are kept in z-order (last added is topmost) with screen
//! rectangles. Every mutating call is recorded so tests can assert the exact
//! sequence of native operations the engine issued.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::CaptureError;
use crate::platform::{
    BoundsMode, NativeMessage, Point, Rect, ShowCommand, WindowHandle, WindowStyle, WindowSystem,
};

/// A recorded mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    SetTitle(WindowHandle, String),
    SetStyle(WindowHandle, WindowStyle),
    SetParent(WindowHandle, Option<WindowHandle>),
    Show(WindowHandle, ShowCommand),
    SetBounds(WindowHandle, Rect, BoundsMode),
    Post(WindowHandle, NativeMessage),
}

impl Call {
    pub(crate) fn handle(&self) -> WindowHandle {
        match self {
            Call::SetTitle(h, _)
            | Call::SetStyle(h, _)
            | Call::SetParent(h, _)
            | Call::Show(h, _)
            | Call::SetBounds(h, _, _)
            | Call::Post(h, _) => *h,
        }
    }

    /// Style or parent changes
    pub(crate) fn is_structural(&self) -> bool {
        matches!(self, Call::SetStyle(..) | Call::SetParent(..))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeWindow {
    pub title: String,
    pub pid: u32,
    pub style: WindowStyle,
    pub parent: Option<WindowHandle>,
    pub visible: bool,
    pub rect: Rect,
}

#[derive(Debug, Default)]
struct Desktop {
    windows: BTreeMap<WindowHandle, FakeWindow>,
    z_order: Vec<WindowHandle>,
    cursor: Point,
    button_down: bool,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    /// Calls left before the named operation fails once
    armed: HashMap<&'static str, usize>,
    /// Style bits the "window manager" forces on every set_style
    sticky_style: u32,
}

/// Scriptable desktop implementing `WindowSystem`
#[derive(Debug, Default)]
pub(crate) struct FakeDesktop {
    inner: RefCell<Desktop>,
}

pub(crate) const DEFAULT_STYLE: WindowStyle =
    WindowStyle(WindowStyle::OVERLAPPED_WINDOW | WindowStyle::VISIBLE);

impl FakeDesktop {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a visible, decorated top-level window
    pub(crate) fn add_window(&self, handle: WindowHandle, title: &str, pid: u32, rect: Rect) {
        let mut desk = self.inner.borrow_mut();
        desk.windows.insert(
            handle,
            FakeWindow {
                title: title.to_string(),
                pid,
                style: DEFAULT_STYLE,
                parent: None,
                visible: true,
                rect,
            },
        );
        desk.z_order.push(handle);
    }

    /// Add a child window owned by the same process as its parent
    pub(crate) fn add_child(&self, parent: WindowHandle, handle: WindowHandle, rect: Rect) {
        let mut desk = self.inner.borrow_mut();
        let pid = desk.windows.get(&parent).map(|w| w.pid).unwrap_or_default();
        desk.windows.insert(
            handle,
            FakeWindow {
                title: String::new(),
                pid,
                style: WindowStyle(WindowStyle::CHILD | WindowStyle::VISIBLE),
                parent: Some(parent),
                visible: true,
                rect,
            },
        );
        desk.z_order.push(handle);
    }

    pub(crate) fn destroy(&self, handle: WindowHandle) {
        let mut desk = self.inner.borrow_mut();
        desk.windows.remove(&handle);
        desk.z_order.retain(|h| *h != handle);
    }

    pub(crate) fn set_visible(&self, handle: WindowHandle, visible: bool) {
        if let Some(window) = self.inner.borrow_mut().windows.get_mut(&handle) {
            window.visible = visible;
        }
    }

    pub(crate) fn move_cursor(&self, point: Point) {
        self.inner.borrow_mut().cursor = point;
    }

    pub(crate) fn press_at(&self, point: Point) {
        let mut desk = self.inner.borrow_mut();
        desk.cursor = point;
        desk.button_down = true;
    }

    pub(crate) fn release_at(&self, point: Point) {
        let mut desk = self.inner.borrow_mut();
        desk.cursor = point;
        desk.button_down = false;
    }

    /// Make every call named `operation` fail until `recover` is called
    pub(crate) fn fail(&self, operation: &'static str) {
        self.inner.borrow_mut().failing.insert(operation);
    }

    /// Make only the `nth` next call named `operation` fail (1 is the next)
    pub(crate) fn fail_nth(&self, operation: &'static str, nth: usize) {
        self.inner.borrow_mut().armed.insert(operation, nth.max(1));
    }

    pub(crate) fn recover(&self, operation: &'static str) {
        self.inner.borrow_mut().failing.remove(operation);
    }

    /// Bits the simulated window manager keeps setting after every style write
    pub(crate) fn force_style_bits(&self, bits: u32) {
        self.inner.borrow_mut().sticky_style = bits;
    }

    pub(crate) fn window(&self, handle: WindowHandle) -> Option<FakeWindow> {
        self.inner.borrow().windows.get(&handle).cloned()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub(crate) fn calls_for(&self, handle: WindowHandle) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.handle() == handle).collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    fn check(&self, operation: &'static str, handle: WindowHandle) -> Result<(), CaptureError> {
        let mut desk = self.inner.borrow_mut();
        if !desk.windows.contains_key(&handle) {
            return Err(CaptureError::StaleHandle(handle));
        }
        if desk.failing.contains(operation) {
            return Err(CaptureError::mutation(handle, operation, "simulated failure"));
        }
        if let Some(left) = desk.armed.get_mut(operation) {
            *left -= 1;
            if *left == 0 {
                desk.armed.remove(operation);
                return Err(CaptureError::mutation(handle, operation, "simulated failure"));
            }
        }
        Ok(())
    }

    fn with_window<T>(
        &self,
        operation: &'static str,
        handle: WindowHandle,
        f: impl FnOnce(&mut FakeWindow) -> T,
    ) -> Result<T, CaptureError> {
        self.check(operation, handle)?;
        let mut desk = self.inner.borrow_mut();
        let window = desk
            .windows
            .get_mut(&handle)
            .ok_or(CaptureError::StaleHandle(handle))?;
        Ok(f(window))
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }
}

impl WindowSystem for FakeDesktop {
    fn is_window(&self, handle: WindowHandle) -> bool {
        self.inner.borrow().windows.contains_key(&handle)
    }

    fn is_visible(&self, handle: WindowHandle) -> bool {
        self.inner
            .borrow()
            .windows
            .get(&handle)
            .map(|w| w.visible)
            .unwrap_or(false)
    }

    fn title(&self, handle: WindowHandle) -> Result<String, CaptureError> {
        self.with_window("GetWindowTextW", handle, |w| w.title.clone())
    }

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<(), CaptureError> {
        self.with_window("SetWindowTextW", handle, |w| w.title = title.to_string())?;
        self.record(Call::SetTitle(handle, title.to_string()));
        Ok(())
    }

    fn process_id(&self, handle: WindowHandle) -> Result<u32, CaptureError> {
        self.with_window("GetWindowThreadProcessId", handle, |w| w.pid)
    }

    fn style(&self, handle: WindowHandle) -> Result<WindowStyle, CaptureError> {
        self.with_window("GetWindowLongW", handle, |w| w.style)
    }

    fn set_style(&self, handle: WindowHandle, style: WindowStyle) -> Result<(), CaptureError> {
        let sticky = self.inner.borrow().sticky_style;
        self.with_window("SetWindowLongW", handle, |w| {
            w.style = WindowStyle(style.0 | sticky)
        })?;
        self.record(Call::SetStyle(handle, style));
        Ok(())
    }

    fn parent(&self, handle: WindowHandle) -> Result<Option<WindowHandle>, CaptureError> {
        self.with_window("GetAncestor", handle, |w| w.parent)
    }

    fn set_parent(
        &self,
        handle: WindowHandle,
        parent: Option<WindowHandle>,
    ) -> Result<(), CaptureError> {
        if let Some(parent) = parent {
            if !self.is_window(parent) {
                return Err(CaptureError::mutation(handle, "SetParent", "parent is gone"));
            }
        }
        self.with_window("SetParent", handle, |w| w.parent = parent)?;
        self.record(Call::SetParent(handle, parent));
        Ok(())
    }

    fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), CaptureError> {
        self.with_window("ShowWindow", handle, |w| {
            w.visible = true;
            w.style = WindowStyle(w.style.0 | WindowStyle::VISIBLE);
        })?;
        self.record(Call::Show(handle, command));
        Ok(())
    }

    fn set_bounds(
        &self,
        handle: WindowHandle,
        bounds: Rect,
        mode: BoundsMode,
    ) -> Result<(), CaptureError> {
        let parent_origin = match (mode, self.parent(handle)?) {
            (BoundsMode::Embedded, Some(parent)) => self.window_rect(parent)?.origin(),
            _ => Point::default(),
        };
        self.with_window("SetWindowPos", handle, |w| {
            w.rect = Rect::new(
                parent_origin.x + bounds.x,
                parent_origin.y + bounds.y,
                bounds.width,
                bounds.height,
            )
        })?;
        self.record(Call::SetBounds(handle, bounds, mode));
        Ok(())
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<Rect, CaptureError> {
        self.with_window("GetWindowRect", handle, |w| w.rect)
    }

    fn is_descendant(&self, ancestor: WindowHandle, handle: WindowHandle) -> bool {
        let desk = self.inner.borrow();
        let mut current = desk.windows.get(&handle).and_then(|w| w.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = desk.windows.get(&parent).and_then(|w| w.parent);
        }
        false
    }

    fn cursor_position(&self) -> Result<Point, CaptureError> {
        Ok(self.inner.borrow().cursor)
    }

    fn primary_button_down(&self) -> bool {
        self.inner.borrow().button_down
    }

    fn window_at(&self, point: Point) -> Option<WindowHandle> {
        let desk = self.inner.borrow();
        desk.z_order
            .iter()
            .rev()
            .copied()
            .find(|h| {
                desk.windows
                    .get(h)
                    .map(|w| w.visible && w.rect.contains(point))
                    .unwrap_or(false)
            })
    }

    fn post_message(
        &self,
        handle: WindowHandle,
        message: NativeMessage,
    ) -> Result<(), CaptureError> {
        self.check("PostMessageW", handle)?;
        self.record(Call::Post(handle, message));
        Ok(())
    }

    fn virtual_key_for_char(&self, ch: char) -> Option<u16> {
        // US layout: letters and digits map to their uppercase ASCII codes
        match ch {
            'a'..='z' => Some(ch.to_ascii_uppercase() as u16),
            'A'..='Z' | '0'..='9' | ' ' => Some(ch as u16),
            '.' => Some(0xBE),
            ',' => Some(0xBC),
            _ => None,
        }
    }
}
