//! Error taxonomy for the capture engine.
//!
//! Every native call made on behalf of the engine returns one of these
//! variants so the capture session can decide, per call site, whether a
//! failure aborts, is logged and ignored, or is retried later.

use thiserror::Error;

use crate::layout::SlotId;
use crate::platform::WindowHandle;

/// Errors produced by the capture engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Candidate is not a live, visible, titled foreign top-level window
    #[error("window {handle} cannot be captured: {reason}")]
    InvalidTarget {
        handle: WindowHandle,
        reason: String,
    },

    /// Handle already has a registry entry
    #[error("window {0} is already captured")]
    AlreadyCaptured(WindowHandle),

    /// A style, parent, position or message call was refused by the system
    #[error("{operation} failed for window {handle}: {message}")]
    MutationFailure {
        handle: WindowHandle,
        operation: &'static str,
        message: String,
    },

    /// Handle no longer refers to a live window
    #[error("window {0} no longer exists")]
    StaleHandle(WindowHandle),

    /// Unexpected failure inside one detector tick
    #[error("drag detector fault: {0}")]
    DetectorFault(String),

    /// Slot is not known to the registry
    #[error("no captured window in slot {0}")]
    UnknownSlot(SlotId),

    /// Slot already hosts a window
    #[error("slot {0} already hosts a window")]
    SlotOccupied(SlotId),

    /// The host shell could not provide or lay out a container
    #[error("host shell error: {0}")]
    Shell(String),
}

impl CaptureError {
    /// Build a mutation failure for `operation` on `handle`
    pub fn mutation(
        handle: WindowHandle,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::MutationFailure {
            handle,
            operation,
            message: message.into(),
        }
    }

    /// Build an invalid-target rejection
    pub fn invalid(handle: WindowHandle, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            handle,
            reason: reason.into(),
        }
    }

    /// Stable code for structured log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "INVALID_TARGET",
            Self::AlreadyCaptured(_) => "ALREADY_CAPTURED",
            Self::MutationFailure { .. } => "MUTATION_FAILURE",
            Self::StaleHandle(_) => "STALE_HANDLE",
            Self::DetectorFault(_) => "DETECTOR_FAULT",
            Self::UnknownSlot(_) => "UNKNOWN_SLOT",
            Self::SlotOccupied(_) => "SLOT_OCCUPIED",
            Self::Shell(_) => "SHELL_ERROR",
        }
    }

    /// True when the window simply went away; callers treat this as a no-op
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleHandle(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_distinct() {
        let handle = WindowHandle(0x42);
        let errors = [
            CaptureError::invalid(handle, "no title"),
            CaptureError::AlreadyCaptured(handle),
            CaptureError::mutation(handle, "SetParent", "access denied"),
            CaptureError::StaleHandle(handle),
            CaptureError::DetectorFault("boom".into()),
            CaptureError::UnknownSlot(SlotId(1)),
            CaptureError::SlotOccupied(SlotId(1)),
            CaptureError::Shell("no host".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_name_the_window() {
        let err = CaptureError::mutation(WindowHandle(0x1F), "SetParent", "access denied");
        assert_eq!(
            err.to_string(),
            "SetParent failed for window 0x1F: access denied"
        );
        assert!(CaptureError::StaleHandle(WindowHandle(1)).is_stale());
        assert!(!err.is_stale());
    }
}
