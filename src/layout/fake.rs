//! Scripted host shell for session and engine tests.
//!
//! Containers are real windows on a shared `FakeDesktop`, so the mutator can
//! reparent into them and the detector sees them as part of the host tree.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use crate::error::CaptureError;
use crate::layout::{Container, LayoutMode, LayoutShell, ShellEvent, SlotId, SlotLayout};
use crate::platform::fake::FakeDesktop;
use crate::platform::{Rect, Size, WindowHandle};

pub(crate) const CONTAINER_SIZE: Size = Size::new(600, 470);

pub(crate) struct FakeShell {
    desktop: Rc<FakeDesktop>,
    host: WindowHandle,
    next_slot: u32,
    next_surface: isize,
    containers: BTreeMap<SlotId, WindowHandle>,
    sizes: HashMap<SlotId, Size>,
    pub layout: SlotLayout,
    pub titles: BTreeMap<SlotId, String>,
    pub detached: Vec<SlotId>,
    pub highlights: Vec<bool>,
    pub fail_create: bool,
    pub fail_attach: bool,
    events: VecDeque<ShellEvent>,
}

impl FakeShell {
    /// Shell whose host window already exists on `desktop`
    pub(crate) fn new(desktop: Rc<FakeDesktop>, host: WindowHandle) -> Self {
        Self {
            desktop,
            host,
            next_slot: 1,
            next_surface: 0x1000,
            containers: BTreeMap::new(),
            sizes: HashMap::new(),
            layout: SlotLayout::new(LayoutMode::Tabs),
            titles: BTreeMap::new(),
            detached: Vec::new(),
            highlights: Vec::new(),
            fail_create: false,
            fail_attach: false,
            events: VecDeque::new(),
        }
    }

    pub(crate) fn surface(&self, slot: SlotId) -> Option<WindowHandle> {
        self.containers.get(&slot).copied()
    }

    /// Simulate the user resizing the host, queueing a `Resized` event
    pub(crate) fn resize_container(&mut self, slot: SlotId, size: Size) {
        self.sizes.insert(slot, size);
        self.events.push_back(ShellEvent::Resized(slot));
    }

    pub(crate) fn push_event(&mut self, event: ShellEvent) {
        self.events.push_back(event);
    }
}

impl LayoutShell for FakeShell {
    fn host_window(&self) -> WindowHandle {
        self.host
    }

    fn create_container(&mut self) -> Result<Container, CaptureError> {
        if self.fail_create {
            return Err(CaptureError::Shell("container creation refused".into()));
        }
        let slot = SlotId(self.next_slot);
        let surface = WindowHandle(self.next_surface);
        self.next_slot += 1;
        self.next_surface += 1;

        self.desktop.add_child(
            self.host,
            surface,
            Rect::new(100, 130, CONTAINER_SIZE.width, CONTAINER_SIZE.height),
        );
        self.containers.insert(slot, surface);
        Ok(Container { slot, surface })
    }

    fn attach(&mut self, slot: SlotId, title: &str) -> Result<(), CaptureError> {
        if self.fail_attach {
            return Err(CaptureError::Shell("layout refused the container".into()));
        }
        self.layout.insert(slot);
        self.titles.insert(slot, title.to_string());
        Ok(())
    }

    fn detach(&mut self, slot: SlotId) {
        self.layout.remove(slot);
        self.titles.remove(&slot);
        self.sizes.remove(&slot);
        if let Some(surface) = self.containers.remove(&slot) {
            self.desktop.destroy(surface);
        }
        self.detached.push(slot);
    }

    fn container_size(&self, slot: SlotId) -> Option<Size> {
        self.containers
            .get(&slot)
            .map(|_| self.sizes.get(&slot).copied().unwrap_or(CONTAINER_SIZE))
    }

    fn set_drop_highlight(&mut self, active: bool) {
        self.highlights.push(active);
    }

    fn poll_events(&mut self) -> Vec<ShellEvent> {
        self.events.drain(..).collect()
    }
}
