/*!
 * Window Grouper Library
 *
 * Drag a foreign top-level window over the host, drop it, and it is
 * embedded into a tab or grid container; closing the slot or the host puts
 * every window back exactly as it was.
 */

pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod host;
pub mod input;
pub mod layout;
pub mod logging;
pub mod mutator;
pub mod platform;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use config::{GrouperConfig, LogConfig};
pub use detector::{DetectorEvent, DragDetector, HostIdentity};
pub use engine::Engine;
pub use error::CaptureError;
pub use layout::{LayoutMode, LayoutShell, ShellEvent, SlotId, SlotLayout};
pub use platform::{WindowHandle, WindowSystem};
pub use session::{CaptureSession, ShutdownReport};
