/*!
 * Container Layout
 *
 * The boundary between the capture engine and the host shell that owns the
 * visual containers (`LayoutShell`), and the platform-neutral tab/grid slot
 * model (`SlotLayout`) shells use to place those containers.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::input::InputEvent;
use crate::platform::{Rect, Size, WindowHandle};

#[cfg(test)]
pub(crate) mod fake;

/// Identifier of one container slot in the host layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the host arranges its containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// One container visible at a time
    #[default]
    Tabs,
    /// Two columns, containers stacked vertically in each
    Grid,
}

/// A container surface able to host one embedded window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container {
    pub slot: SlotId,
    /// Native drawing surface the embedded window is reparented into
    pub surface: WindowHandle,
}

/// Events a shell reports to the engine between ticks
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    /// Container geometry changed
    Resized(SlotId),
    /// Local input observed on a container
    Input { slot: SlotId, event: InputEvent },
    /// User asked to close the slot (eject its window)
    CloseSlot(SlotId),
    /// Host is closing
    Quit,
}

/// Presentation shell hosting the containers.
///
/// The shell decides tab or grid placement; the engine only asks for a
/// container, attaches it once the window is embedded, and detaches it on
/// release.
pub trait LayoutShell {
    /// The host's own top-level window
    fn host_window(&self) -> WindowHandle;

    /// Create an empty container; it is not yet part of the layout
    fn create_container(&mut self) -> Result<Container, CaptureError>;

    /// Place a container holding an embedded window into the layout
    fn attach(&mut self, slot: SlotId, title: &str) -> Result<(), CaptureError>;

    /// Remove the slot from the layout and destroy its container
    fn detach(&mut self, slot: SlotId);

    /// Current client size of the container, if it still exists
    fn container_size(&self, slot: SlotId) -> Option<Size>;

    /// Drop-target feedback while a foreign window is dragged over the host
    fn set_drop_highlight(&mut self, active: bool);

    /// Drain pending shell events
    fn poll_events(&mut self) -> Vec<ShellEvent>;
}

/// Slot placement for tab and grid modes.
///
/// Tabs keep insertion order with one active slot. Grid mode places each new
/// slot in the column holding fewer slots (left on ties). Switching mode
/// migrates every slot, preserving order.
#[derive(Debug, Clone, Default)]
pub struct SlotLayout {
    mode: LayoutMode,
    tabs: Vec<SlotId>,
    active: Option<usize>,
    columns: [Vec<SlotId>; 2],
}

impl SlotLayout {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        match self.mode {
            LayoutMode::Tabs => self.tabs.len(),
            LayoutMode::Grid => self.columns[0].len() + self.columns[1].len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.slots().contains(&slot)
    }

    /// All slots in display order (grid: left column, then right)
    pub fn slots(&self) -> Vec<SlotId> {
        match self.mode {
            LayoutMode::Tabs => self.tabs.clone(),
            LayoutMode::Grid => self.columns[0]
                .iter()
                .chain(self.columns[1].iter())
                .copied()
                .collect(),
        }
    }

    /// Add a slot; in tab mode it becomes the active tab
    pub fn insert(&mut self, slot: SlotId) {
        if self.contains(slot) {
            return;
        }
        match self.mode {
            LayoutMode::Tabs => {
                self.tabs.push(slot);
                self.active = Some(self.tabs.len() - 1);
            }
            LayoutMode::Grid => {
                let column = if self.columns[0].len() <= self.columns[1].len() {
                    0
                } else {
                    1
                };
                self.columns[column].push(slot);
            }
        }
    }

    /// Remove a slot; returns false if it was not laid out
    pub fn remove(&mut self, slot: SlotId) -> bool {
        match self.mode {
            LayoutMode::Tabs => {
                let Some(index) = self.tabs.iter().position(|s| *s == slot) else {
                    return false;
                };
                self.tabs.remove(index);
                self.active = match self.active {
                    _ if self.tabs.is_empty() => None,
                    Some(active) if active > index => Some(active - 1),
                    Some(active) => Some(active.min(self.tabs.len() - 1)),
                    None => Some(0),
                };
                true
            }
            LayoutMode::Grid => {
                for column in &mut self.columns {
                    if let Some(index) = column.iter().position(|s| *s == slot) {
                        column.remove(index);
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Switch mode, migrating slots; returns false if already in `mode`
    pub fn set_mode(&mut self, mode: LayoutMode) -> bool {
        if mode == self.mode {
            return false;
        }
        let slots = self.slots();
        self.tabs.clear();
        self.columns = Default::default();
        self.active = None;
        self.mode = mode;
        for slot in slots {
            self.insert(slot);
        }
        true
    }

    /// Active tab (tab mode only)
    pub fn active(&self) -> Option<SlotId> {
        match self.mode {
            LayoutMode::Tabs => self.active.and_then(|i| self.tabs.get(i).copied()),
            LayoutMode::Grid => None,
        }
    }

    pub fn activate(&mut self, slot: SlotId) -> bool {
        match self.tabs.iter().position(|s| *s == slot) {
            Some(index) if self.mode == LayoutMode::Tabs => {
                self.active = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Cycle forward with wrap-around; no-op unless in tab mode with 2+ tabs
    pub fn next_tab(&mut self) -> Option<SlotId> {
        self.cycle(1)
    }

    pub fn previous_tab(&mut self) -> Option<SlotId> {
        self.cycle(-1)
    }

    fn cycle(&mut self, step: isize) -> Option<SlotId> {
        if self.mode != LayoutMode::Tabs || self.tabs.len() < 2 {
            return None;
        }
        let count = self.tabs.len() as isize;
        let current = self.active.unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(count) as usize;
        self.active = Some(next);
        self.tabs.get(next).copied()
    }

    /// Client-relative rectangles of the visible containers
    pub fn visible_rects(&self, client: Size) -> Vec<(SlotId, Rect)> {
        match self.mode {
            LayoutMode::Tabs => self
                .active()
                .map(|slot| vec![(slot, Rect::new(0, 0, client.width, client.height))])
                .unwrap_or_default(),
            LayoutMode::Grid => {
                let occupied: Vec<&Vec<SlotId>> =
                    self.columns.iter().filter(|c| !c.is_empty()).collect();
                if occupied.is_empty() {
                    return Vec::new();
                }
                let column_width = client.width / occupied.len() as u32;
                let mut rects = Vec::with_capacity(self.len());
                for (col, slots) in occupied.iter().enumerate() {
                    let x = (column_width * col as u32) as i32;
                    let width = if col + 1 == occupied.len() {
                        client.width - column_width * col as u32
                    } else {
                        column_width
                    };
                    let row_height = client.height / slots.len() as u32;
                    for (row, slot) in slots.iter().enumerate() {
                        let y = (row_height * row as u32) as i32;
                        let height = if row + 1 == slots.len() {
                            client.height - row_height * row as u32
                        } else {
                            row_height
                        };
                        rects.push((*slot, Rect::new(x, y, width, height)));
                    }
                }
                rects
            }
        }
    }
}
