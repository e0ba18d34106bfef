/*!
 * Native Window Mutator
 *
 * The only component that changes a foreign window's style, parent and
 * placement. `capture` strips the caption, marks the window as a child and
 * reparents it into a container surface; `restore` reverses all of it,
 * best-effort, and always puts the original title back.
 */

use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::platform::{BoundsMode, Rect, ShowCommand, Size, WindowHandle, WindowStyle, WindowSystem};

/// How a released window is put back on the desktop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePolicy {
    /// Marker prepended to the title while a restore is in flight
    pub prefix: String,
    /// Top-level rectangle a restored window is shown at
    pub default_rect: Rect,
    /// Upper bound on waiting for the window to settle
    pub settle_timeout: Duration,
    pub settle_poll: Duration,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            prefix: "RESTORING...".to_string(),
            default_rect: Rect::new(100, 100, 800, 600),
            settle_timeout: Duration::from_millis(200),
            settle_poll: Duration::from_millis(20),
        }
    }
}

/// A window that passed `inspect`, with the state observed at that moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub handle: WindowHandle,
    pub style: WindowStyle,
    pub title: String,
}

pub struct WindowMutator {
    system: Rc<dyn WindowSystem>,
    policy: RestorePolicy,
}

impl WindowMutator {
    pub fn new(system: Rc<dyn WindowSystem>, policy: RestorePolicy) -> Self {
        Self { system, policy }
    }

    pub fn policy(&self) -> &RestorePolicy {
        &self.policy
    }

    /// Title shown while `title`'s window is being restored
    pub fn restoring_title(&self, title: &str) -> String {
        format!("{} {}", self.policy.prefix, title)
    }

    /// Check that `handle` is a live, visible top-level window with a
    /// non-empty title
    pub fn inspect(&self, handle: WindowHandle) -> Result<CaptureTarget, CaptureError> {
        if !self.system.is_window(handle) {
            return Err(CaptureError::invalid(handle, "not a window"));
        }
        if !self.system.is_visible(handle) {
            return Err(CaptureError::invalid(handle, "window is not visible"));
        }
        if self.system.parent(handle)?.is_some() {
            return Err(CaptureError::invalid(handle, "not a top-level window"));
        }
        let title = self.system.title(handle)?;
        if title.is_empty() {
            return Err(CaptureError::invalid(handle, "window has no title"));
        }
        let style = self.system.style(handle)?;
        Ok(CaptureTarget {
            handle,
            style,
            title,
        })
    }

    /// Embed `target` into `surface`, returning the style it replaced.
    ///
    /// On failure the window is put back the way it was found before the
    /// error is returned.
    pub fn capture(
        &self,
        target: &CaptureTarget,
        surface: WindowHandle,
    ) -> Result<WindowStyle, CaptureError> {
        let handle = target.handle;
        let original = self.system.style(handle)?;
        if original != target.style {
            debug!(
                "Style of {} changed since inspection ({} -> {})",
                handle, target.style, original
            );
        }

        self.system.set_style(handle, original.embedded())?;

        if let Err(e) = self.system.set_parent(handle, Some(surface)) {
            warn!("Reparenting {} into {} failed: {}", handle, surface, e);
            self.undo_capture(handle, original, false);
            return Err(e);
        }

        if let Err(e) = self.system.show(handle, ShowCommand::Show) {
            warn!("Showing {} after reparent failed: {}", handle, e);
            self.undo_capture(handle, original, true);
            return Err(e);
        }

        info!(
            "Captured {} \"{}\" into surface {} (style {} -> {})",
            handle,
            target.title,
            surface,
            original,
            original.embedded()
        );
        Ok(original)
    }

    fn undo_capture(&self, handle: WindowHandle, original: WindowStyle, reparented: bool) {
        if reparented {
            if let Err(e) = self.system.set_parent(handle, None) {
                warn!("Rollback: detaching {} failed: {}", handle, e);
            }
        }
        if let Err(e) = self.system.set_style(handle, original) {
            warn!("Rollback: restoring style of {} failed: {}", handle, e);
        }
    }

    /// Fill the container: move to (0,0) with exactly `size`
    pub fn resize(&self, handle: WindowHandle, size: Size) -> Result<(), CaptureError> {
        self.system.set_bounds(
            handle,
            Rect::new(0, 0, size.width, size.height),
            BoundsMode::Embedded,
        )
    }

    /// Reverse a capture.
    ///
    /// Every step is attempted even after an earlier one failed, and the
    /// original title is always written last. The first error is returned.
    pub fn restore(
        &self,
        handle: WindowHandle,
        original_style: WindowStyle,
        original_title: &str,
    ) -> Result<(), CaptureError> {
        let mut first_error = None;

        keep_first(
            &mut first_error,
            self.system
                .set_title(handle, &self.restoring_title(original_title)),
        );
        keep_first(&mut first_error, self.system.set_style(handle, original_style));
        keep_first(&mut first_error, self.system.set_parent(handle, None));
        keep_first(&mut first_error, self.system.show(handle, ShowCommand::Restore));
        keep_first(
            &mut first_error,
            self.system
                .set_bounds(handle, self.policy.default_rect, BoundsMode::TopLevel),
        );

        let stale = first_error.as_ref().is_some_and(CaptureError::is_stale);
        if !stale {
            keep_first(
                &mut first_error,
                self.wait_for_convergence(handle, original_style),
            );
        }

        keep_first(&mut first_error, self.system.set_title(handle, original_title));

        match first_error {
            None => {
                info!("Restored {} \"{}\"", handle, original_title);
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Last attempt to get a window out of a container that is about to be
    /// destroyed: original style, no parent, original title. No waiting.
    pub fn force_detach(
        &self,
        handle: WindowHandle,
        original_style: WindowStyle,
        original_title: &str,
    ) -> Result<(), CaptureError> {
        let mut first_error = None;
        keep_first(&mut first_error, self.system.set_style(handle, original_style));
        keep_first(&mut first_error, self.system.set_parent(handle, None));
        keep_first(&mut first_error, self.system.set_title(handle, original_title));
        match first_error {
            None => {
                info!("Detached {} \"{}\" after a failed restore", handle, original_title);
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Poll until the window is top-level with its original style again
    fn wait_for_convergence(
        &self,
        handle: WindowHandle,
        original_style: WindowStyle,
    ) -> Result<(), CaptureError> {
        let deadline = Instant::now() + self.policy.settle_timeout;
        let wanted = original_style.0 & !WindowStyle::VISIBLE;

        loop {
            if !self.system.is_window(handle) {
                return Err(CaptureError::StaleHandle(handle));
            }
            let parent = self.system.parent(handle)?;
            let style = self.system.style(handle)?;
            if parent.is_none() && style.0 & !WindowStyle::VISIBLE == wanted {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(CaptureError::mutation(
                    handle,
                    "settle",
                    format!(
                        "not settled after {:?} (parent {:?}, style {}, expected {})",
                        self.policy.settle_timeout, parent, style, original_style
                    ),
                ));
            }
            thread::sleep(self.policy.settle_poll.min(deadline - now));
        }
    }
}

fn keep_first(slot: &mut Option<CaptureError>, result: Result<(), CaptureError>) {
    if let Err(e) = result {
        debug!("Restore step failed: {}", e);
        slot.get_or_insert(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{Call, FakeDesktop, DEFAULT_STYLE};

    const HOST: WindowHandle = WindowHandle(1);
    const SURFACE: WindowHandle = WindowHandle(2);
    const NOTEPAD: WindowHandle = WindowHandle(10);

    fn policy() -> RestorePolicy {
        RestorePolicy {
            settle_timeout: Duration::from_millis(30),
            settle_poll: Duration::from_millis(5),
            ..RestorePolicy::default()
        }
    }

    fn setup() -> (Rc<FakeDesktop>, WindowMutator) {
        let desktop = Rc::new(FakeDesktop::new());
        desktop.add_window(HOST, "Window Grouper", 42, Rect::new(100, 100, 600, 500));
        desktop.add_child(HOST, SURFACE, Rect::new(100, 130, 600, 470));
        desktop.add_window(NOTEPAD, "Notepad", 999, Rect::new(300, 20, 400, 300));
        let mutator = WindowMutator::new(desktop.clone(), policy());
        (desktop, mutator)
    }

    #[test]
    fn inspect_rejects_unusable_windows() {
        let (desktop, mutator) = setup();
        desktop.add_window(WindowHandle(11), "", 5, Rect::new(0, 0, 10, 10));
        desktop.add_window(WindowHandle(12), "Hidden", 5, Rect::new(0, 0, 10, 10));
        desktop.set_visible(WindowHandle(12), false);

        for handle in [WindowHandle(11), WindowHandle(12), WindowHandle(404)] {
            let err = mutator.inspect(handle).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_TARGET", "{}", handle);
        }

        let target = mutator.inspect(NOTEPAD).unwrap();
        assert_eq!(target.title, "Notepad");
        assert_eq!(target.style, DEFAULT_STYLE);
    }

    #[test]
    fn inspect_rejects_child_windows() {
        let (desktop, mutator) = setup();
        let edit = WindowHandle(11);
        desktop.add_child(NOTEPAD, edit, Rect::new(300, 50, 400, 270));
        desktop.set_title(edit, "Edit").unwrap();
        desktop.clear_calls();

        let err = mutator.inspect(edit).unwrap_err();
        assert_eq!(err, CaptureError::invalid(edit, "not a top-level window"));
        assert!(desktop.calls().is_empty());
    }

    #[test]
    fn blank_but_non_empty_titles_are_accepted() {
        let (desktop, mutator) = setup();
        desktop.add_window(WindowHandle(11), "   ", 5, Rect::new(0, 0, 10, 10));
        assert_eq!(mutator.inspect(WindowHandle(11)).unwrap().title, "   ");
    }

    #[test]
    fn capture_strips_caption_and_reparents() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();

        let original = mutator.capture(&target, SURFACE).unwrap();
        assert_eq!(original, DEFAULT_STYLE);

        let window = desktop.window(NOTEPAD).unwrap();
        assert!(!window.style.contains(WindowStyle::CAPTION));
        assert!(window.style.contains(WindowStyle::CHILD));
        assert_eq!(window.parent, Some(SURFACE));
        assert_eq!(
            desktop.calls_for(NOTEPAD),
            vec![
                Call::SetStyle(NOTEPAD, DEFAULT_STYLE.embedded()),
                Call::SetParent(NOTEPAD, Some(SURFACE)),
                Call::Show(NOTEPAD, ShowCommand::Show),
            ]
        );
    }

    #[test]
    fn failed_reparent_puts_the_style_back() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        desktop.fail("SetParent");

        let err = mutator.capture(&target, SURFACE).unwrap_err();
        assert_eq!(err.error_code(), "MUTATION_FAILURE");

        let window = desktop.window(NOTEPAD).unwrap();
        assert_eq!(window.style, DEFAULT_STYLE);
        assert_eq!(window.parent, None);
    }

    #[test]
    fn resize_fills_the_container() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        mutator.capture(&target, SURFACE).unwrap();
        desktop.clear_calls();

        mutator.resize(NOTEPAD, Size::new(300, 200)).unwrap();
        assert_eq!(
            desktop.calls(),
            vec![Call::SetBounds(
                NOTEPAD,
                Rect::new(0, 0, 300, 200),
                BoundsMode::Embedded
            )]
        );
        assert_eq!(
            desktop.window(NOTEPAD).unwrap().rect,
            Rect::new(100, 130, 300, 200)
        );
    }

    #[test]
    fn restore_round_trips_style_parent_and_title() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        let original = mutator.capture(&target, SURFACE).unwrap();
        mutator.resize(NOTEPAD, Size::new(640, 480)).unwrap();
        desktop.clear_calls();

        mutator.restore(NOTEPAD, original, &target.title).unwrap();

        assert_eq!(
            desktop.calls(),
            vec![
                Call::SetTitle(NOTEPAD, "RESTORING... Notepad".to_string()),
                Call::SetStyle(NOTEPAD, DEFAULT_STYLE),
                Call::SetParent(NOTEPAD, None),
                Call::Show(NOTEPAD, ShowCommand::Restore),
                Call::SetBounds(NOTEPAD, Rect::new(100, 100, 800, 600), BoundsMode::TopLevel),
                Call::SetTitle(NOTEPAD, "Notepad".to_string()),
            ]
        );
        let window = desktop.window(NOTEPAD).unwrap();
        assert_eq!(window.style, DEFAULT_STYLE);
        assert_eq!(window.parent, None);
        assert_eq!(window.title, "Notepad");
    }

    #[test]
    fn failed_restore_still_fixes_the_title() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        let original = mutator.capture(&target, SURFACE).unwrap();
        desktop.fail("SetParent");

        let err = mutator.restore(NOTEPAD, original, "Notepad").unwrap_err();
        assert_eq!(
            err,
            CaptureError::mutation(NOTEPAD, "SetParent", "simulated failure")
        );
        let window = desktop.window(NOTEPAD).unwrap();
        assert_eq!(window.title, "Notepad");
        assert_eq!(window.parent, Some(SURFACE));
    }

    #[test]
    fn force_detach_skips_the_wait_and_frees_the_window() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        let original = mutator.capture(&target, SURFACE).unwrap();
        desktop.clear_calls();

        mutator.force_detach(NOTEPAD, original, "Notepad").unwrap();
        assert_eq!(
            desktop.calls(),
            vec![
                Call::SetStyle(NOTEPAD, DEFAULT_STYLE),
                Call::SetParent(NOTEPAD, None),
                Call::SetTitle(NOTEPAD, "Notepad".to_string()),
            ]
        );
        assert_eq!(desktop.window(NOTEPAD).unwrap().parent, None);
    }

    #[test]
    fn convergence_wait_is_bounded() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        let original = mutator.capture(&target, SURFACE).unwrap();
        desktop.force_style_bits(WindowStyle::CHILD);

        let started = Instant::now();
        let err = mutator.restore(NOTEPAD, original, "Notepad").unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(
            err,
            CaptureError::MutationFailure {
                operation: "settle",
                ..
            }
        ));
        assert_eq!(desktop.window(NOTEPAD).unwrap().title, "Notepad");
    }

    #[test]
    fn restoring_a_vanished_window_reports_stale() {
        let (desktop, mutator) = setup();
        let target = mutator.inspect(NOTEPAD).unwrap();
        let original = mutator.capture(&target, SURFACE).unwrap();
        desktop.destroy(NOTEPAD);
        desktop.clear_calls();

        let err = mutator.restore(NOTEPAD, original, "Notepad").unwrap_err();
        assert!(err.is_stale());
        assert!(desktop.calls().is_empty());
    }
}
