/*!
 * Global Drag-Gesture Detector
 *
 * Polls the global mouse state on every engine tick and turns a
 * press-drag-release of a foreign top-level window over the host into a
 * capture request. The detector never touches the windows it watches; it only
 * reports events.
 */

use std::rc::Rc;

use sysinfo::{Pid, System};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::platform::{Point, WindowHandle, WindowSystem};
use crate::registry::WindowHandleRegistry;

/// Parent-chain walks give up after this many hops
const MAX_ANCESTRY: usize = 64;

/// What identifies the host, so it never captures itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub window: WindowHandle,
    pub pid: u32,
    pub title: String,
    pub restoring_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorEvent {
    /// A foreign window is being dragged
    DragStarted { handle: WindowHandle, title: String },
    /// Button still held; `accept` is whether the cursor is over the host
    Hover { accept: bool },
    /// Released over the host
    CommitCapture(WindowHandle),
    /// Drop feedback should be removed
    FeedbackCleared,
}

/// Gesture state for one press-to-release cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragCandidate {
    pub handle: Option<WindowHandle>,
    pub button_was_down: bool,
}

pub struct DragDetector {
    system: Rc<dyn WindowSystem>,
    host: HostIdentity,
    candidate: DragCandidate,
    feedback_active: bool,
    processes: System,
}

impl DragDetector {
    pub fn new(system: Rc<dyn WindowSystem>, host: HostIdentity) -> Self {
        Self {
            system,
            host,
            candidate: DragCandidate::default(),
            feedback_active: false,
            processes: System::new(),
        }
    }

    pub fn candidate(&self) -> DragCandidate {
        self.candidate
    }

    pub fn host(&self) -> &HostIdentity {
        &self.host
    }

    /// Run one poll. A fault is logged and resets the detector to idle.
    pub fn tick(&mut self, registry: &WindowHandleRegistry) -> Vec<DetectorEvent> {
        match self.step(registry) {
            Ok(events) => events,
            Err(e) => {
                let fault = match e {
                    CaptureError::DetectorFault(_) => e,
                    other => CaptureError::DetectorFault(other.to_string()),
                };
                warn!("{}; resetting drag detector", fault);
                let had_feedback = self.feedback_active;
                self.reset();
                if had_feedback {
                    vec![DetectorEvent::FeedbackCleared]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn reset(&mut self) {
        self.candidate = DragCandidate::default();
        self.feedback_active = false;
    }

    fn step(&mut self, registry: &WindowHandleRegistry) -> Result<Vec<DetectorEvent>, CaptureError> {
        let down = self.system.primary_button_down();
        let mut events = Vec::new();

        match (down, self.candidate.button_was_down) {
            // Press edge
            (true, false) => {
                self.candidate.button_was_down = true;
                let cursor = self.system.cursor_position()?;
                if let Some((handle, title)) = self.candidate_at(cursor, registry)? {
                    self.candidate.handle = Some(handle);
                    events.push(DetectorEvent::DragStarted { handle, title });
                }
            }
            // Held
            (true, true) => {
                if self.candidate.handle.is_some() {
                    let accept = self.cursor_over_host()?;
                    self.feedback_active = true;
                    events.push(DetectorEvent::Hover { accept });
                }
            }
            // Release edge
            (false, true) => {
                self.candidate.button_was_down = false;
                if let Some(handle) = self.candidate.handle.take() {
                    if self.cursor_over_host()? {
                        info!("Drop of {} over host, requesting capture", handle);
                        events.push(DetectorEvent::CommitCapture(handle));
                    } else {
                        debug!("Drag of {} ended outside the host", handle);
                    }
                    self.feedback_active = false;
                    events.push(DetectorEvent::FeedbackCleared);
                }
            }
            (false, false) => {
                if self.feedback_active {
                    self.feedback_active = false;
                    events.push(DetectorEvent::FeedbackCleared);
                }
            }
        }
        Ok(events)
    }

    fn cursor_over_host(&self) -> Result<bool, CaptureError> {
        let cursor = self.system.cursor_position()?;
        let bounds = self.system.window_rect(self.host.window)?;
        Ok(bounds.contains(cursor))
    }

    /// Foreign top-level window under `cursor`, if it may be captured
    fn candidate_at(
        &mut self,
        cursor: Point,
        registry: &WindowHandleRegistry,
    ) -> Result<Option<(WindowHandle, String)>, CaptureError> {
        let Some(hit) = self.system.window_at(cursor) else {
            return Ok(None);
        };
        let root = self.root_of(hit)?;

        if root == self.host.window || self.system.is_descendant(self.host.window, root) {
            return Ok(None);
        }
        if registry.contains(root) {
            debug!("{} is already captured", root);
            return Ok(None);
        }

        let pid = self.system.process_id(root)?;
        if pid == self.host.pid {
            return Ok(None);
        }

        let title = self.system.title(root)?;
        if title.contains(&self.host.title) || title.contains(&self.host.restoring_prefix) {
            debug!("Ignoring {} \"{}\"", root, title);
            return Ok(None);
        }

        info!(
            "Drag candidate {} \"{}\" ({} pid {})",
            root,
            title,
            self.process_name(pid),
            pid
        );
        Ok(Some((root, title)))
    }

    fn root_of(&self, handle: WindowHandle) -> Result<WindowHandle, CaptureError> {
        let mut current = handle;
        for _ in 0..MAX_ANCESTRY {
            match self.system.parent(current)? {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
        Err(CaptureError::DetectorFault(format!(
            "parent chain of {} is deeper than {}",
            handle, MAX_ANCESTRY
        )))
    }

    fn process_name(&mut self, pid: u32) -> String {
        let pid = Pid::from_u32(pid);
        self.processes.refresh_process(pid);
        self.processes
            .process(pid)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
