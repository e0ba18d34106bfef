/*!
 * Reference Host Shell
 *
 * Keyboard shortcuts shared by host shells, and the Win32 shell itself: a
 * top-level host window with one child container window per slot.
 *
 * Shortcuts (with Ctrl held):
 * - `1` / `2`: tab / grid layout
 * - `Space` / `Shift+Space`: next / previous tab
 * - `W`: close the active slot, restoring its window
 * - `T`: toggle always-on-top
 */

#[cfg(target_os = "windows")]
pub mod win32;

use tracing::debug;

use crate::layout::{LayoutMode, SlotId, SlotLayout};

const VK_SPACE: u16 = 0x20;
const VK_1: u16 = 0x31;
const VK_2: u16 = 0x32;
const VK_T: u16 = 0x54;
const VK_W: u16 = 0x57;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    SetMode(LayoutMode),
    NextTab,
    PreviousTab,
    CloseActive,
    ToggleAlwaysOnTop,
}

impl Shortcut {
    /// Shortcut for a Ctrl-modified key press
    pub fn from_key(vk: u16, shift: bool) -> Option<Self> {
        match vk {
            VK_1 => Some(Self::SetMode(LayoutMode::Tabs)),
            VK_2 => Some(Self::SetMode(LayoutMode::Grid)),
            VK_SPACE if shift => Some(Self::PreviousTab),
            VK_SPACE => Some(Self::NextTab),
            VK_W => Some(Self::CloseActive),
            VK_T => Some(Self::ToggleAlwaysOnTop),
            _ => None,
        }
    }
}

/// What the shell must do after a shortcut was applied to its layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Visible containers changed
    Relayout,
    Close(SlotId),
    ToggleAlwaysOnTop,
    Nothing,
}

/// Apply `shortcut` to `layout`. `focused` is the slot whose container has
/// keyboard focus, used to pick the slot to close in grid mode.
pub fn apply_shortcut(
    layout: &mut SlotLayout,
    shortcut: Shortcut,
    focused: Option<SlotId>,
) -> ShortcutAction {
    debug!("Shortcut {:?}", shortcut);
    match shortcut {
        Shortcut::SetMode(mode) => {
            if layout.set_mode(mode) {
                ShortcutAction::Relayout
            } else {
                ShortcutAction::Nothing
            }
        }
        Shortcut::NextTab => layout
            .next_tab()
            .map(|_| ShortcutAction::Relayout)
            .unwrap_or(ShortcutAction::Nothing),
        Shortcut::PreviousTab => layout
            .previous_tab()
            .map(|_| ShortcutAction::Relayout)
            .unwrap_or(ShortcutAction::Nothing),
        Shortcut::CloseActive => layout
            .active()
            .or(focused.filter(|slot| layout.contains(*slot)))
            .map(ShortcutAction::Close)
            .unwrap_or(ShortcutAction::Nothing),
        Shortcut::ToggleAlwaysOnTop => ShortcutAction::ToggleAlwaysOnTop,
    }
}
