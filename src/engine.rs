/*!
 * Engine Loop
 *
 * One tick: drain host shell events, then poll the drag detector and act
 * on what it reports. `run` drives ticks on a tokio interval until the host
 * quits or the shutdown future resolves, then restores every captured window.
 */

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::GrouperConfig;
use crate::detector::{DetectorEvent, DragDetector};
use crate::layout::{LayoutShell, ShellEvent};
use crate::platform::WindowSystem;
use crate::session::{CaptureSession, ShutdownReport};

pub struct Engine<S: LayoutShell> {
    session: CaptureSession<S>,
    detector: DragDetector,
    tick_interval: Duration,
    quit_requested: bool,
}

impl<S: LayoutShell> Engine<S> {
    pub fn new(system: Rc<dyn WindowSystem>, shell: S, config: &GrouperConfig) -> Self {
        let detector = DragDetector::new(
            system.clone(),
            config.host_identity(shell.host_window()),
        );
        let session = CaptureSession::new(
            system,
            shell,
            config.host_title.clone(),
            config.restore_policy(),
        );
        Self::from_parts(session, detector, config.tick_interval())
    }

    pub fn from_parts(
        session: CaptureSession<S>,
        detector: DragDetector,
        tick_interval: Duration,
    ) -> Self {
        Self {
            session,
            detector,
            tick_interval,
            quit_requested: false,
        }
    }

    pub fn session(&self) -> &CaptureSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CaptureSession<S> {
        &mut self.session
    }

    /// Run one tick; returns false once the host asked to quit
    pub fn tick(&mut self) -> bool {
        for event in self.session.shell_mut().poll_events() {
            self.handle_shell_event(event);
        }
        if self.quit_requested {
            return false;
        }

        for event in self.detector.tick(self.session.registry()) {
            self.handle_detector_event(event);
        }
        true
    }

    fn handle_shell_event(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::Resized(slot) => {
                if let Err(e) = self.session.on_container_resized(slot) {
                    warn!("Resize of slot {} failed: {}", slot, e);
                }
            }
            ShellEvent::Input { slot, event } => {
                match self.session.forward_input(slot, &event) {
                    Ok(outcome) => debug!("Input for slot {}: {:?}", slot, outcome),
                    Err(e) => debug!("Input for slot {} dropped: {}", slot, e),
                }
            }
            ShellEvent::CloseSlot(slot) => {
                if let Err(e) = self.session.release(slot) {
                    warn!("[{}] Closing slot {} failed: {}", e.error_code(), slot, e);
                }
            }
            ShellEvent::Quit => {
                info!("Host window closing");
                self.quit_requested = true;
            }
        }
    }

    fn handle_detector_event(&mut self, event: DetectorEvent) {
        match event {
            DetectorEvent::DragStarted { handle, title } => {
                debug!("Tracking drag of {} \"{}\"", handle, title);
            }
            DetectorEvent::Hover { accept } => {
                self.session.shell_mut().set_drop_highlight(accept);
            }
            DetectorEvent::CommitCapture(handle) => {
                self.session.shell_mut().set_drop_highlight(false);
                if let Err(e) = self.session.commit_capture(handle) {
                    warn!("[{}] Capture of {} failed: {}", e.error_code(), handle, e);
                }
            }
            DetectorEvent::FeedbackCleared => {
                self.session.shell_mut().set_drop_highlight(false);
            }
        }
    }

    /// Tick until the host quits or `shutdown` resolves, then restore
    /// every captured window
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> ShutdownReport {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Engine running (tick every {:?})", self.tick_interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    if !self.tick() {
                        break;
                    }
                }
            }
        }

        self.session.shutdown()
    }
}
