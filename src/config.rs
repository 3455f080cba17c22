//! Studio RPC configuration parameters
//!
//! All tunable parameters for the RPC core. Values can be loaded from a
//! JSON document at provisioning time or from a postcard blob kept in
//! flash.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::studio::lock::LockState;

/// How an unlock request from a studio client is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnlockPolicy {
    /// The request unlocks immediately.
    #[default]
    Direct,
    /// The request only enters `Unlocking`; a local confirmation
    /// (physical key press) completes the unlock.
    Confirm,
}

/// RPC core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    // --- Lock ---
    /// Lock state at boot
    pub initial_lock_state: LockState,
    /// How `request_unlock` behaves
    pub unlock_policy: UnlockPolicy,
    /// Re-lock whenever the active transport is deselected
    pub lock_on_disconnect: bool,
    /// Re-lock after this many seconds without a request (0 = never)
    pub idle_lock_timeout_secs: u32,

    // --- Events ---
    /// How long an async producer may wait for event queue space (milliseconds)
    pub event_enqueue_timeout_ms: u32,

    // --- Transmit ---
    /// How long an outbound message may wait for TX ring space (milliseconds)
    pub tx_full_timeout_ms: u32,
    /// Attempts per GATT notification before the chunk is abandoned
    pub gatt_notify_attempts: u8,
    /// Pause between failed GATT notification attempts (milliseconds)
    pub gatt_notify_retry_ms: u32,
    /// Serial TX is kicked once the TX ring is more than this full (1-100%)
    pub uart_tx_watermark_percent: u8,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            // Lock
            initial_lock_state: LockState::Locked,
            unlock_policy: UnlockPolicy::Direct,
            lock_on_disconnect: true,
            idle_lock_timeout_secs: 0,

            // Events
            event_enqueue_timeout_ms: 50,

            // Transmit
            tx_full_timeout_ms: 100,
            gatt_notify_attempts: 5,
            gatt_notify_retry_ms: 200,
            uart_tx_watermark_percent: 50,
        }
    }
}

impl RpcConfig {
    /// Reject values the core cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.tx_full_timeout_ms == 0 {
            return Err(Error::Config("tx_full_timeout_ms must be at least 1"));
        }
        if self.gatt_notify_attempts == 0 {
            return Err(Error::Config("gatt_notify_attempts must be at least 1"));
        }
        if self.uart_tx_watermark_percent == 0 || self.uart_tx_watermark_percent > 100 {
            return Err(Error::Config("uart_tx_watermark_percent must be 1-100"));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let cfg: Self =
            serde_json::from_slice(bytes).map_err(|_| Error::Config("invalid JSON config"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialise for flash persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("config encode failed"))
    }

    /// Load a blob written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cfg: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("corrupt config blob"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
