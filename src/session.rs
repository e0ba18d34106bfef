/*!
 * Capture Session
 *
 * Owns the registry and coordinates mutator, forwarder and shell for every
 * embed/restore cycle. A window is either fully embedded and registered, or
 * back on the desktop and unregistered: every failure path below rolls the
 * native state back before the registry entry is dropped.
 */

use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::error::CaptureError;
use crate::input::{InputEvent, InputForwarder, InputOutcome};
use crate::layout::{LayoutShell, SlotId};
use crate::mutator::{RestorePolicy, WindowMutator};
use crate::platform::{WindowHandle, WindowStyle, WindowSystem};
use crate::registry::{CaptureState, WindowHandleRegistry};

/// Outcome of restoring every captured window on exit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub restored: usize,
    pub failed: usize,
}

pub struct CaptureSession<S: LayoutShell> {
    system: Rc<dyn WindowSystem>,
    shell: S,
    registry: WindowHandleRegistry,
    mutator: WindowMutator,
    forwarder: InputForwarder,
    host_title: String,
}

impl<S: LayoutShell> CaptureSession<S> {
    pub fn new(
        system: Rc<dyn WindowSystem>,
        shell: S,
        host_title: impl Into<String>,
        policy: RestorePolicy,
    ) -> Self {
        Self {
            mutator: WindowMutator::new(system.clone(), policy),
            forwarder: InputForwarder::new(system.clone()),
            system,
            shell,
            registry: WindowHandleRegistry::new(),
            host_title: host_title.into(),
        }
    }

    pub fn registry(&self) -> &WindowHandleRegistry {
        &self.registry
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    pub fn host_window(&self) -> WindowHandle {
        self.shell.host_window()
    }

    /// Embed `handle` into a new container and return its slot
    pub fn commit_capture(&mut self, handle: WindowHandle) -> Result<SlotId, CaptureError> {
        if self.registry.contains(handle) {
            return Err(CaptureError::AlreadyCaptured(handle));
        }
        let target = self.mutator.inspect(handle)?;
        let container = self.shell.create_container()?;
        let slot = container.slot;

        if let Err(e) = self.registry.begin(
            handle,
            target.style,
            &target.title,
            slot,
            container.surface,
        ) {
            self.shell.detach(slot);
            return Err(e);
        }

        let original = match self.mutator.capture(&target, container.surface) {
            Ok(style) => style,
            Err(e) => {
                self.registry.remove(handle);
                self.shell.detach(slot);
                return Err(e);
            }
        };

        let attached = self
            .registry
            .mark_embedded(handle, original)
            .and_then(|()| self.shell.attach(slot, &target.title));
        if let Err(e) = attached {
            self.abort_capture(handle, slot, original, &target.title, false);
            return Err(e);
        }

        if let Some(size) = self.shell.container_size(slot) {
            if let Err(e) = self.mutator.resize(handle, size) {
                self.abort_capture(handle, slot, original, &target.title, true);
                return Err(e);
            }
        }

        info!(
            "Embedded {} \"{}\" in slot {} ({} captured)",
            handle,
            target.title,
            slot,
            self.registry.len()
        );
        Ok(slot)
    }

    /// Undo a capture that got past the native mutation.
    ///
    /// If the window cannot be taken back out of its container, the capture
    /// is kept as embedded so it is retried on release or shutdown instead of
    /// being destroyed with the container.
    fn abort_capture(
        &mut self,
        handle: WindowHandle,
        slot: SlotId,
        original: WindowStyle,
        title: &str,
        attached: bool,
    ) {
        warn!("Rolling back capture of {} from slot {}", handle, slot);
        let Err(e) = self.mutator.restore(handle, original, title) else {
            self.shell.detach(slot);
            self.registry.remove(handle);
            return;
        };

        let surface = self.registry.get(handle).map(|entry| entry.surface);
        if let Some(surface) = surface.filter(|s| self.still_embedded(handle, *s)) {
            error!("Rollback of {} failed, keeping it in slot {}: {}", handle, slot, e);
            if let Err(e) = self.registry.mark_embedded(handle, original) {
                warn!("Could not mark {} embedded: {}", handle, e);
            }
            if !attached {
                if let Err(e) = self.shell.attach(slot, title) {
                    warn!("Slot {} stays hidden: {}", slot, e);
                }
            }
            return;
        }

        if !e.is_stale() {
            error!("Rollback of {} incomplete: {}", handle, e);
        }
        self.shell.detach(slot);
        self.registry.remove(handle);
    }

    /// Whether `handle` is alive and still a child of `surface`
    fn still_embedded(&self, handle: WindowHandle, surface: WindowHandle) -> bool {
        self.system.is_window(handle)
            && matches!(self.system.parent(handle), Ok(Some(p)) if p == surface)
    }

    /// Fit the embedded window to its container's new size
    pub fn on_container_resized(&mut self, slot: SlotId) -> Result<(), CaptureError> {
        let Some(entry) = self.registry.embedded_in(slot) else {
            debug!("Resize of slot {} with nothing embedded", slot);
            return Ok(());
        };
        let Some(size) = self.shell.container_size(slot) else {
            return Ok(());
        };
        match self.mutator.resize(entry.handle, size) {
            Err(e) if e.is_stale() => {
                warn!("Embedded window {} in slot {} is gone", entry.handle, slot);
                Ok(())
            }
            other => other,
        }
    }

    pub fn forward_input(
        &mut self,
        slot: SlotId,
        event: &InputEvent,
    ) -> Result<InputOutcome, CaptureError> {
        let entry = self
            .registry
            .by_slot(slot)
            .ok_or(CaptureError::UnknownSlot(slot))?;
        if entry.state != CaptureState::Embedded {
            return Ok(InputOutcome::Ignored);
        }
        self.forwarder.forward(entry.surface, entry.handle, event)
    }

    /// Restore the window in `slot` to the desktop and drop the slot.
    ///
    /// If the restore fails while the window is still alive inside its
    /// container, the entry stays registered as embedded and the error is
    /// returned.
    pub fn release(&mut self, slot: SlotId) -> Result<(), CaptureError> {
        let entry = self
            .registry
            .by_slot(slot)
            .cloned()
            .ok_or(CaptureError::UnknownSlot(slot))?;
        let handle = entry.handle;
        self.registry.set_state(handle, CaptureState::Restoring)?;

        let result = match self
            .mutator
            .restore(handle, entry.original_style, &entry.original_title)
        {
            Err(e) if e.is_stale() => {
                debug!("Window {} vanished before release", handle);
                Ok(())
            }
            other => other,
        };

        if let Err(e) = &result {
            if self.still_embedded(handle, entry.surface) {
                error!("Release of {} failed, keeping it embedded: {}", handle, e);
                self.registry.set_state(handle, CaptureState::Embedded)?;
                return result;
            }
            warn!("Release of {} completed with errors: {}", handle, e);
        }

        self.shell.detach(slot);
        self.registry.remove(handle);
        info!(
            "Released {} \"{}\" from slot {}",
            handle, entry.original_title, slot
        );
        result
    }

    /// Restore every captured window, most recent first. Calling it again
    /// once everything is restored does nothing.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        if self.registry.is_empty() {
            debug!("Shutdown: nothing to restore");
            return report;
        }

        let host = self.shell.host_window();
        let busy_title = self.mutator.restoring_title(&self.host_title);
        if let Err(e) = self.system.set_title(host, &busy_title) {
            warn!("Could not mark host as restoring: {}", e);
        }

        let order = self.registry.restore_order();
        info!("Shutdown: restoring {} window(s)", order.len());
        for slot in order {
            match self.release(slot) {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    error!("Shutdown restore of slot {} failed: {}", slot, e);
                    if self.detach_remaining(slot) {
                        report.restored += 1;
                    } else {
                        report.failed += 1;
                    }
                }
            }
        }

        if let Err(e) = self.system.set_title(host, &self.host_title) {
            warn!("Could not reset host title: {}", e);
        }
        info!(
            "Shutdown complete: {} restored, {} failed",
            report.restored, report.failed
        );
        report
    }

    /// Get a window whose release failed out of its container before the
    /// container goes away. Returns true if the window was freed here.
    fn detach_remaining(&mut self, slot: SlotId) -> bool {
        let Some(entry) = self.registry.by_slot(slot).cloned() else {
            return false;
        };
        let handle = entry.handle;
        match self
            .mutator
            .force_detach(handle, entry.original_style, &entry.original_title)
        {
            Err(e) if !e.is_stale() && self.still_embedded(handle, entry.surface) => {
                error!("{} is still embedded in slot {}: {}", handle, slot, e);
                false
            }
            result => {
                if let Err(e) = result {
                    warn!("Detached {} with errors: {}", handle, e);
                }
                self.shell.detach(slot);
                self.registry.remove(handle);
                true
            }
        }
    }
}
