//! Studio lock state machine.
//!
//! ```text
//!             initiate_unlock()            complete_unlock()
//!   ┌────────┐ ───────────────▶ ┌───────────┐ ───────────────▶ ┌──────────┐
//!   │ Locked │                  │ Unlocking │                  │ Unlocked │
//!   └────────┘ ◀──────────────────────────────────── lock() ── └──────────┘
//!        │                        unlock()                          ▲
//!        └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Secured RPC handlers only run while the state is `Unlocked`. Every
//! transition, including a transition to the current state, raises
//! [`StudioEvent::LockStateChanged`] so connected clients always learn the
//! latest state.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::events::{EventSink, StudioEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LockState {
    Locked = 0,
    Unlocking = 1,
    Unlocked = 2,
}

impl LockState {
    /// Decode the atomic representation. Unknown values fail closed.
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Unlocking,
            2 => Self::Unlocked,
            _ => Self::Locked,
        }
    }
}

/// Process-wide lock state, shared by `Arc` between the RPC worker,
/// the handlers that change it and any firmware context that confirms
/// an unlock (e.g. a dedicated key binding).
pub struct LockStateMachine {
    state: AtomicU8,
    sink: Arc<dyn EventSink>,
}

impl LockStateMachine {
    pub fn new(initial: LockState, sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
            sink,
        }
    }

    pub fn state(&self) -> LockState {
        LockState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == LockState::Unlocked
    }

    /// Direct transition to `Unlocked`, skipping the confirmation step.
    pub fn unlock(&self) {
        self.set_state(LockState::Unlocked);
    }

    pub fn lock(&self) {
        self.set_state(LockState::Locked);
    }

    /// Enter `Unlocking`; an external confirmation calls [`complete_unlock`](Self::complete_unlock).
    pub fn initiate_unlock(&self) {
        self.set_state(LockState::Unlocking);
    }

    pub fn complete_unlock(&self) {
        self.set_state(LockState::Unlocked);
    }

    fn set_state(&self, new_state: LockState) {
        let prev = LockState::from_u8(self.state.swap(new_state as u8, Ordering::AcqRel));
        if prev != new_state {
            info!("Studio lock: {:?} -> {:?}", prev, new_state);
        }
        self.sink.emit(StudioEvent::LockStateChanged(new_state));
    }
}

// ── Tests ────────────────────────────────────────────────────
