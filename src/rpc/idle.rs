//! Idle auto-lock timer.
//!
//! Counts time since the last dispatched request and fires once when the
//! configured timeout elapses. A timeout of zero disables it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    /// No timeout configured.
    Disabled,
    /// Counting towards `timeout_ms`.
    Armed { timeout_ms: u64 },
    /// Fired; stays quiet until the next request re-arms it.
    Expired { timeout_ms: u64 },
}

pub struct IdleLockTimer {
    state: IdleState,
    elapsed_ms: u64,
}

impl IdleLockTimer {
    pub fn new(timeout_secs: u32) -> Self {
        let state = if timeout_secs == 0 {
            IdleState::Disabled
        } else {
            IdleState::Armed {
                timeout_ms: u64::from(timeout_secs) * 1000,
            }
        };
        Self {
            state,
            elapsed_ms: 0,
        }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != IdleState::Disabled
    }

    /// Activity seen: restart the countdown.
    pub fn reset(&mut self) {
        if let IdleState::Expired { timeout_ms } = self.state {
            self.state = IdleState::Armed { timeout_ms };
        }
        self.elapsed_ms = 0;
    }

    /// Advance by `delta_ms`. Returns `true` exactly once per idle period.
    pub fn tick(&mut self, delta_ms: u64) -> bool {
        match self.state {
            IdleState::Armed { timeout_ms } => {
                self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
                if self.elapsed_ms >= timeout_ms {
                    self.state = IdleState::Expired { timeout_ms };
                    true
                } else {
                    false
                }
            }
            IdleState::Disabled | IdleState::Expired { .. } => false,
        }
    }
}
