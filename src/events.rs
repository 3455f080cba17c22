//! Internal domain events.
//!
//! Events are produced by:
//! - The lock state machine (every transition)
//! - Any other firmware context that owns studio-visible state
//!
//! Events are consumed by the RPC worker, which runs them through the
//! notification mapper registry and streams the resulting notifications
//! to the active transport.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Lock machine │────▶│              │     │  RPC worker  │
//! │ Other ctx    │────▶│  EventSink   │────▶│  → mappers   │
//! │              │     │  (queue)     │     │  → TX ring   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use crate::studio::lock::LockState;

/// Events raised inside the firmware that a studio client may care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudioEvent {
    /// The lock state machine performed a transition (possibly to the same state).
    LockStateChanged(LockState),
}

impl StudioEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::LockStateChanged(_) => EventKind::LockStateChanged,
        }
    }
}

/// Payload-free discriminant of [`StudioEvent`], used for mapper subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LockStateChanged,
}

/// Destination for raised events.
///
/// Implementations must be callable from any context, so `emit` takes
/// `&self` and must never block indefinitely.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: StudioEvent);
}
