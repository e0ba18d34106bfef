/// Mouse message construction for embedded windows

use super::keys::{
    HTCLIENT, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEACTIVATE,
    WM_MOUSEMOVE, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SETFOCUS,
};
use super::{MouseButton, MouseButtons};
use crate::platform::{NativeMessage, Point, WindowHandle};

/// Pack client coordinates the way mouse messages carry them (low word x,
/// high word y, each truncated to 16 bits)
pub fn make_lparam(point: Point) -> isize {
    let x = (point.x as u32) & 0xFFFF;
    let y = (point.y as u32) & 0xFFFF;
    ((y << 16) | x) as i32 as isize
}

fn down_message(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => WM_LBUTTONDOWN,
        MouseButton::Right => WM_RBUTTONDOWN,
        MouseButton::Middle => WM_MBUTTONDOWN,
    }
}

fn up_message(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => WM_LBUTTONUP,
        MouseButton::Right => WM_RBUTTONUP,
        MouseButton::Middle => WM_MBUTTONUP,
    }
}

/// Activate, focus, then press
pub fn press(
    surface: WindowHandle,
    button: MouseButton,
    at: Point,
    held: MouseButtons,
) -> Vec<NativeMessage> {
    let activate = (HTCLIENT << 16) | (surface.0 as usize & 0xFFFF);
    vec![
        NativeMessage::new(WM_MOUSEACTIVATE, activate, 0),
        NativeMessage::new(WM_SETFOCUS, surface.0 as usize, 0),
        NativeMessage::new(
            down_message(button),
            held.with(button).flags(),
            make_lparam(at),
        ),
    ]
}

/// Button-up carrying the buttons still held
pub fn release(button: MouseButton, at: Point, held: MouseButtons) -> NativeMessage {
    NativeMessage::new(
        up_message(button),
        held.without(button).flags(),
        make_lparam(at),
    )
}

pub fn movement(at: Point, held: MouseButtons) -> NativeMessage {
    NativeMessage::new(WM_MOUSEMOVE, held.flags(), make_lparam(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keys::{MK_LBUTTON, MK_RBUTTON};

    #[test]
    fn lparam_packs_x_low_and_y_high() {
        assert_eq!(make_lparam(Point::new(20, 30)), (30 << 16) | 20);
        assert_eq!(make_lparam(Point::new(0, 0)), 0);
        // Negative x keeps only its low word
        assert_eq!(make_lparam(Point::new(-1, 0)), 0xFFFF);
    }

    #[test]
    fn press_activates_and_focuses_first() {
        let messages = press(
            WindowHandle(0x12345),
            MouseButton::Left,
            Point::new(5, 6),
            MouseButtons::default(),
        );
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, WM_MOUSEACTIVATE);
        assert_eq!(messages[0].wparam, (1 << 16) | 0x2345);
        assert_eq!(messages[1], NativeMessage::new(WM_SETFOCUS, 0x12345, 0));
        assert_eq!(messages[2].id, WM_LBUTTONDOWN);
        assert_eq!(messages[2].wparam, MK_LBUTTON);
    }

    #[test]
    fn release_reports_remaining_buttons() {
        let held = MouseButtons::default()
            .with(MouseButton::Left)
            .with(MouseButton::Right);
        let message = release(MouseButton::Left, Point::new(1, 1), held);
        assert_eq!(message.id, WM_LBUTTONUP);
        assert_eq!(message.wparam, MK_RBUTTON);
    }
}
