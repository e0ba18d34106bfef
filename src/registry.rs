//! Window Handle Registry
//!
//! Tracks every captured foreign window with the state needed to undo the
//! capture. An entry is created in `Embedding` state, holding the original
//! style and title, before any native mutation happens, so no style change
//! is ever applied without a matching restore record.

use std::collections::HashMap;

use tracing::debug;

use crate::error::CaptureError;
use crate::layout::SlotId;
use crate::platform::{WindowHandle, WindowStyle};

/// Lifecycle of a captured window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Registered, native capture in progress
    Embedding,
    /// Reparented into its container
    Embedded,
    /// Restore in progress
    Restoring,
}

/// One embedded foreign window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedWindow {
    pub handle: WindowHandle,
    pub original_style: WindowStyle,
    pub original_title: String,
    /// Container slot that owns the window
    pub slot: SlotId,
    /// Native surface of that container
    pub surface: WindowHandle,
    pub state: CaptureState,
    /// Capture order, used for reverse-order shutdown
    pub sequence: u64,
}

/// Registry of captured windows, keyed by handle and by slot
#[derive(Debug, Default)]
pub struct WindowHandleRegistry {
    entries: HashMap<WindowHandle, CapturedWindow>,
    slots: HashMap<SlotId, WindowHandle>,
    next_sequence: u64,
}

impl WindowHandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a capture about to start.
    ///
    /// Fails if the handle is already registered or the slot already hosts a
    /// window; the registry is unchanged in that case.
    pub fn begin(
        &mut self,
        handle: WindowHandle,
        original_style: WindowStyle,
        original_title: &str,
        slot: SlotId,
        surface: WindowHandle,
    ) -> Result<&CapturedWindow, CaptureError> {
        if self.entries.contains_key(&handle) {
            return Err(CaptureError::AlreadyCaptured(handle));
        }
        if self.slots.contains_key(&slot) {
            return Err(CaptureError::SlotOccupied(slot));
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.slots.insert(slot, handle);
        debug!("Registry: {} -> slot {} (seq {})", handle, slot, sequence);

        Ok(self.entries.entry(handle).or_insert(CapturedWindow {
            handle,
            original_style,
            original_title: original_title.to_string(),
            slot,
            surface,
            state: CaptureState::Embedding,
            sequence,
        }))
    }

    /// Mark the capture complete, recording the style actually replaced
    pub fn mark_embedded(
        &mut self,
        handle: WindowHandle,
        original_style: WindowStyle,
    ) -> Result<(), CaptureError> {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(CaptureError::StaleHandle(handle))?;
        entry.original_style = original_style;
        entry.state = CaptureState::Embedded;
        Ok(())
    }

    pub fn set_state(&mut self, handle: WindowHandle, state: CaptureState) -> Result<(), CaptureError> {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(CaptureError::StaleHandle(handle))?;
        entry.state = state;
        Ok(())
    }

    pub fn get(&self, handle: WindowHandle) -> Option<&CapturedWindow> {
        self.entries.get(&handle)
    }

    pub fn by_slot(&self, slot: SlotId) -> Option<&CapturedWindow> {
        self.slots.get(&slot).and_then(|h| self.entries.get(h))
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Entry for `slot` if its window is fully embedded
    pub fn embedded_in(&self, slot: SlotId) -> Option<&CapturedWindow> {
        self.by_slot(slot)
            .filter(|entry| entry.state == CaptureState::Embedded)
    }

    pub fn remove(&mut self, handle: WindowHandle) -> Option<CapturedWindow> {
        let entry = self.entries.remove(&handle)?;
        self.slots.remove(&entry.slot);
        debug!("Registry: released {} from slot {}", handle, entry.slot);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots in reverse capture order (most recent first)
    pub fn restore_order(&self) -> Vec<SlotId> {
        let mut entries: Vec<&CapturedWindow> = self.entries.values().collect();
        entries.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        entries.into_iter().map(|e| e.slot).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedWindow> {
        self.entries.values()
    }
}
