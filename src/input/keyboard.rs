/// Keyboard translation for embedded windows

use tracing::debug;

use super::keys::{named_key, WM_CHAR, WM_KEYDOWN, WM_KEYUP};
use super::Key;
use crate::platform::{NativeMessage, WindowSystem};

/// Repeat count 1
const KEYDOWN_LPARAM: isize = 0x0000_0001;
/// Repeat count 1, previous state down, transition up
const KEYUP_LPARAM: isize = 0xC000_0001u32 as i32 as isize;

/// A key resolved to a virtual-key code and the character it types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub virtual_key: u16,
    pub character: Option<char>,
}

/// Resolve a key press, or `None` if it should be handled locally.
///
/// Named keys map directly; anything else must type exactly one printable
/// character that the active layout can produce.
pub fn translate(system: &dyn WindowSystem, key: &Key, text: &str) -> Option<KeyStroke> {
    if let Some((virtual_key, character)) = named_key(key) {
        return Some(KeyStroke {
            virtual_key,
            character,
        });
    }

    let mut chars = text.chars();
    let ch = match (chars.next(), chars.next()) {
        (Some(ch), None) if !ch.is_control() => ch,
        _ => return None,
    };
    let virtual_key = system.virtual_key_for_char(ch)?;
    debug!("Mapped {:?} to virtual key 0x{:02X}", ch, virtual_key);
    Some(KeyStroke {
        virtual_key,
        character: Some(ch),
    })
}

/// KEYDOWN, CHAR (when the key types something), KEYUP
pub fn messages(stroke: KeyStroke) -> Vec<NativeMessage> {
    let vk = stroke.virtual_key as usize;
    let mut out = vec![NativeMessage::new(WM_KEYDOWN, vk, KEYDOWN_LPARAM)];
    if let Some(ch) = stroke.character {
        out.push(NativeMessage::new(WM_CHAR, ch as usize, KEYDOWN_LPARAM));
    }
    out.push(NativeMessage::new(WM_KEYUP, vk, KEYUP_LPARAM));
    out
}
