/// Win32 message, flag and virtual-key constants used for forwarding
///
/// Reference: WinUser.h

use super::Key;

// Window messages
pub const WM_SETFOCUS: u32 = 0x0007;
pub const WM_MOUSEACTIVATE: u32 = 0x0021;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;

// Held-button flags carried in mouse message wparam
pub const MK_LBUTTON: usize = 0x0001;
pub const MK_RBUTTON: usize = 0x0002;
pub const MK_MBUTTON: usize = 0x0010;

/// Hit-test code for the client area
pub const HTCLIENT: usize = 1;

// Virtual keys
pub const VK_BACK: u16 = 0x08;
pub const VK_TAB: u16 = 0x09;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_DELETE: u16 = 0x2E;

/// Virtual key and produced character for keys that bypass the layout.
///
/// Arrows produce no character; the rest carry their canonical control
/// character.
pub fn named_key(key: &Key) -> Option<(u16, Option<char>)> {
    match key {
        Key::Enter => Some((VK_RETURN, Some('\r'))),
        Key::Escape => Some((VK_ESCAPE, Some('\u{1B}'))),
        Key::Tab => Some((VK_TAB, Some('\t'))),
        Key::Backspace => Some((VK_BACK, Some('\u{08}'))),
        Key::Delete => Some((VK_DELETE, Some('\u{7F}'))),
        Key::Left => Some((VK_LEFT, None)),
        Key::Up => Some((VK_UP, None)),
        Key::Right => Some((VK_RIGHT, None)),
        Key::Down => Some((VK_DOWN, None)),
        Key::Other => None,
    }
}

/// Inverse of `named_key`, for keys reported by the host's own windows
pub fn key_for_virtual_key(vk: u16) -> Option<Key> {
    match vk {
        VK_RETURN => Some(Key::Enter),
        VK_ESCAPE => Some(Key::Escape),
        VK_TAB => Some(Key::Tab),
        VK_BACK => Some(Key::Backspace),
        VK_DELETE => Some(Key::Delete),
        VK_LEFT => Some(Key::Left),
        VK_UP => Some(Key::Up),
        VK_RIGHT => Some(Key::Right),
        VK_DOWN => Some(Key::Down),
        _ => None,
    }
}
