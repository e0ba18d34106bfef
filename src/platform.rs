/*!
 * Platform Window System
 *
 * Geometry and handle types shared by the engine, plus the `WindowSystem`
 * capability trait: the primitive, fallible window queries and mutations the
 * mutator, forwarder and detector are built on. Only the Windows backend
 * touches native APIs; tests use an in-memory desktop.
 */

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

#[cfg(target_os = "windows")]
pub mod win32;

#[cfg(test)]
pub(crate) mod fake;

/// Opaque native window identifier (an HWND on Windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Screen or client position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle; `contains` is half-open on the right and bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from left/top/right/bottom edges (Win32 RECT layout)
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            left,
            top,
            (right - left).max(0) as u32,
            (bottom - top).max(0) as u32,
        )
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

/// Window style bitmask, restorable byte-for-byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowStyle(pub u32);

impl WindowStyle {
    /// Title bar and border (WS_CAPTION)
    pub const CAPTION: u32 = 0x00C0_0000;
    /// Child window (WS_CHILD)
    pub const CHILD: u32 = 0x4000_0000;
    /// Initially visible (WS_VISIBLE)
    pub const VISIBLE: u32 = 0x1000_0000;
    /// Standard decorated top-level window (WS_OVERLAPPEDWINDOW)
    pub const OVERLAPPED_WINDOW: u32 = 0x00CF_0000;

    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Style applied while a window is embedded: no title bar, child bit set
    pub fn embedded(self) -> Self {
        Self((self.0 & !Self::CAPTION) | Self::CHILD)
    }
}

impl fmt::Display for WindowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Show command for `WindowSystem::show`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    /// Make visible in its current placement (SW_SHOW)
    Show,
    /// Activate and restore from minimized/maximized (SW_RESTORE)
    Restore,
}

/// How `WindowSystem::set_bounds` applies a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsMode {
    /// Move/resize relative to the parent and repaint
    Embedded,
    /// Top-level placement with frame recompute and unchanged z-order
    TopLevel,
}

/// A message posted to a window's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeMessage {
    pub id: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl NativeMessage {
    pub const fn new(id: u32, wparam: usize, lparam: isize) -> Self {
        Self { id, wparam, lparam }
    }
}

/// Primitive window operations the engine needs from the platform.
///
/// Every call is fallible: the windows involved belong to other processes
/// and may disappear between any two calls.
pub trait WindowSystem {
    /// Whether `handle` refers to a live window
    fn is_window(&self, handle: WindowHandle) -> bool;

    fn is_visible(&self, handle: WindowHandle) -> bool;

    fn title(&self, handle: WindowHandle) -> Result<String, CaptureError>;

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<(), CaptureError>;

    /// Id of the process that owns the window
    fn process_id(&self, handle: WindowHandle) -> Result<u32, CaptureError>;

    fn style(&self, handle: WindowHandle) -> Result<WindowStyle, CaptureError>;

    fn set_style(&self, handle: WindowHandle, style: WindowStyle) -> Result<(), CaptureError>;

    /// Parent window, or `None` for a top-level window
    fn parent(&self, handle: WindowHandle) -> Result<Option<WindowHandle>, CaptureError>;

    /// Reparent under `parent`, or detach to top level with `None`
    fn set_parent(
        &self,
        handle: WindowHandle,
        parent: Option<WindowHandle>,
    ) -> Result<(), CaptureError>;

    fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), CaptureError>;

    fn set_bounds(
        &self,
        handle: WindowHandle,
        bounds: Rect,
        mode: BoundsMode,
    ) -> Result<(), CaptureError>;

    /// Window rectangle in screen coordinates
    fn window_rect(&self, handle: WindowHandle) -> Result<Rect, CaptureError>;

    /// Whether `handle` is a (transitive) child of `ancestor`
    fn is_descendant(&self, ancestor: WindowHandle, handle: WindowHandle) -> bool;

    fn cursor_position(&self) -> Result<Point, CaptureError>;

    /// Global state of the primary mouse button
    fn primary_button_down(&self) -> bool;

    /// Deepest window directly under a screen point
    fn window_at(&self, point: Point) -> Option<WindowHandle>;

    /// Post without waiting for the target to process the message
    fn post_message(&self, handle: WindowHandle, message: NativeMessage)
        -> Result<(), CaptureError>;

    /// Virtual-key code for a character in the active keyboard layout
    fn virtual_key_for_char(&self, ch: char) -> Option<u16>;
}

/// Get platform name
pub fn get_platform_name() -> &'static str {
    #[cfg(target_os = "windows")]
    return "windows";

    #[cfg(target_os = "macos")]
    return "macos";

    #[cfg(target_os = "linux")]
    return "linux";

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    return "unknown";
}

/// Whether native window capture is available on this platform
pub fn is_supported() -> bool {
    cfg!(target_os = "windows")
}

/// Create the native window system for this platform
pub fn create_window_system() -> anyhow::Result<Rc<dyn WindowSystem>> {
    #[cfg(target_os = "windows")]
    {
        Ok(Rc::new(win32::Win32WindowSystem::new()))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(anyhow::anyhow!(
            "Window capture is not supported on {}",
            get_platform_name()
        ))
    }
}
