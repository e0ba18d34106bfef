/*!
 * Input Forwarding
 *
 * Re-targets local input observed on a container to the window embedded in
 * it. Mouse positions are converted container-local -> screen -> window
 * relative and every message is posted, never sent, so a hung foreign window
 * cannot block the host.
 */

pub mod keyboard;
pub mod keys;
pub mod mouse;

use std::rc::Rc;

use tracing::debug;

use crate::error::CaptureError;
use crate::platform::{Point, WindowHandle, WindowSystem};

pub use keyboard::KeyStroke;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Set of mouse buttons currently held down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl MouseButtons {
    pub fn with(mut self, button: MouseButton) -> Self {
        self.set(button, true);
        self
    }

    pub fn without(mut self, button: MouseButton) -> Self {
        self.set(button, false);
        self
    }

    fn set(&mut self, button: MouseButton, down: bool) {
        match button {
            MouseButton::Left => self.left = down,
            MouseButton::Right => self.right = down,
            MouseButton::Middle => self.middle = down,
        }
    }

    /// `MK_*` flags for mouse message wparam
    pub fn flags(self) -> usize {
        let mut flags = 0;
        if self.left {
            flags |= keys::MK_LBUTTON;
        }
        if self.right {
            flags |= keys::MK_RBUTTON;
        }
        if self.middle {
            flags |= keys::MK_MBUTTON;
        }
        flags
    }
}

/// Keys with a fixed virtual-key mapping; everything else is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Left,
    Up,
    Right,
    Down,
    Other,
}

/// Input observed on a container, in container-local coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    MousePress {
        button: MouseButton,
        position: Point,
        held: MouseButtons,
    },
    MouseRelease {
        button: MouseButton,
        position: Point,
        held: MouseButtons,
    },
    MouseMove {
        position: Point,
        held: MouseButtons,
    },
    /// `text` is what the key would type locally
    KeyPress { key: Key, text: String },
}

/// What happened to a forwarded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Number of native messages posted
    Posted(usize),
    /// Not translatable; the host should handle it normally
    PassThrough,
    /// Target window is gone
    Ignored,
}

pub struct InputForwarder {
    system: Rc<dyn WindowSystem>,
}

impl InputForwarder {
    pub fn new(system: Rc<dyn WindowSystem>) -> Self {
        Self { system }
    }

    /// Post `event`, observed on `surface`, to the window embedded in it
    pub fn forward(
        &self,
        surface: WindowHandle,
        target: WindowHandle,
        event: &InputEvent,
    ) -> Result<InputOutcome, CaptureError> {
        match self.post_event(surface, target, event) {
            Err(e) if e.is_stale() => {
                debug!("Dropping input for vanished window {}", target);
                Ok(InputOutcome::Ignored)
            }
            other => other,
        }
    }

    fn post_event(
        &self,
        surface: WindowHandle,
        target: WindowHandle,
        event: &InputEvent,
    ) -> Result<InputOutcome, CaptureError> {
        let messages = match event {
            InputEvent::MousePress {
                button,
                position,
                held,
            } => mouse::press(surface, *button, self.to_window(surface, target, *position)?, *held),
            InputEvent::MouseRelease {
                button,
                position,
                held,
            } => vec![mouse::release(
                *button,
                self.to_window(surface, target, *position)?,
                *held,
            )],
            InputEvent::MouseMove { position, held } => vec![mouse::movement(
                self.to_window(surface, target, *position)?,
                *held,
            )],
            InputEvent::KeyPress { key, text } => {
                match keyboard::translate(self.system.as_ref(), key, text) {
                    Some(stroke) => keyboard::messages(stroke),
                    None => return Ok(InputOutcome::PassThrough),
                }
            }
        };

        for message in &messages {
            self.system.post_message(target, *message)?;
        }
        Ok(InputOutcome::Posted(messages.len()))
    }

    /// Container-local point to `target`-relative point via screen space
    fn to_window(
        &self,
        surface: WindowHandle,
        target: WindowHandle,
        local: Point,
    ) -> Result<Point, CaptureError> {
        let container = self.system.window_rect(surface)?.origin();
        let window = self.system.window_rect(target)?.origin();
        let screen = container.offset(local.x, local.y);
        Ok(screen.offset(-window.x, -window.y))
    }
}
