//! BLE RPC transport — studio RPC over a GATT write/notify characteristic.
//!
//! The client writes frame bytes to the RPC characteristic; the device
//! answers with notifications on the same characteristic. Frames are
//! already delimited by the framing layer, so notifications are plain
//! MTU-sized slices of the TX ring with no extra header.
//!
//! ## TX accounting
//!
//! Each selection opens a TX session with `notify_size` taken from the
//! connection's negotiated data length. Committed bytes accumulate in
//! `pending_notify` and are flushed when a message completes or more than
//! one notification's worth is pending.
//!
//! ```text
//!   TX ring ──▶ [ ≤ MTU ] [ ≤ MTU ] [ rest ] ──▶ notify × n
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use log::{info, warn};

use crate::config::RpcConfig;
use crate::error::TransportError;
use crate::rpc::channels::{RpcChannels, TxRing};
use crate::rpc::transport::{RpcTransport, TransportKind};

/// ATT payload size before any MTU exchange.
pub const DEFAULT_MTU: usize = 23;

/// Largest LE data length; bounds the notification staging buffer.
const MAX_NOTIFY_SIZE: usize = 251;

/// RX ring reservations tried per GATT write before the rest is dropped.
const RX_WRITE_ATTEMPTS: usize = 8;

/// BT host stack access for the RPC characteristic.
pub trait GattNotifier: Send + Sync {
    /// Negotiated TX data length of the active connection, or `None`
    /// when no central is connected.
    fn connection_mtu(&self) -> Option<usize>;

    /// Send one notification on the RPC characteristic.
    fn notify(&self, data: &[u8]) -> Result<(), TransportError>;
}

// ── BT callback handle ───────────────────────────────────────

pub struct GattLink {
    channels: Arc<RpcChannels>,
    receiving: AtomicBool,
}

impl GattLink {
    pub fn new(channels: Arc<RpcChannels>) -> Self {
        Self {
            channels,
            receiving: AtomicBool::new(false),
        }
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving.load(Ordering::Acquire)
    }

    /// GATT write callback. Copies `data` into the RX ring while receive
    /// is enabled and always reports the full length as accepted.
    pub fn on_write(&self, data: &[u8]) -> usize {
        if !self.is_receiving() {
            return data.len();
        }

        let mut copied = 0;
        for _ in 0..RX_WRITE_ATTEMPTS {
            copied += self.channels.rx.write(&data[copied..]);
            if copied == data.len() {
                break;
            }
            // Ring full: wake the worker and let it drain.
            self.channels.rx_notify();
            std::thread::yield_now();
        }
        if copied < data.len() {
            warn!(
                "GATT RPC: RX ring full, dropped {} of {} bytes",
                data.len() - copied,
                data.len()
            );
        }

        self.channels.rx_notify();
        data.len()
    }
}

// ── Worker-side transport ────────────────────────────────────

/// Per-connection TX bookkeeping, reset on every selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GattWriteState {
    pub notify_size: usize,
    pub pending_notify: usize,
}

pub struct GattTransport {
    link: Arc<GattLink>,
    notifier: Arc<dyn GattNotifier>,
    state: GattWriteState,
    notify_attempts: u8,
    retry_delay: Duration,
}

impl GattTransport {
    /// Returns the transport for the registry and the link for the BT
    /// write callback.
    pub fn new(
        channels: Arc<RpcChannels>,
        notifier: Arc<dyn GattNotifier>,
        config: &RpcConfig,
    ) -> (Self, Arc<GattLink>) {
        let link = Arc::new(GattLink::new(channels));
        (
            Self {
                link: link.clone(),
                notifier,
                state: GattWriteState::default(),
                notify_attempts: config.gatt_notify_attempts,
                retry_delay: Duration::from_millis(u64::from(config.gatt_notify_retry_ms)),
            },
            link,
        )
    }

    pub fn write_state(&self) -> GattWriteState {
        self.state
    }

    /// Send everything in the TX ring as notifications.
    fn flush(&mut self, tx: &TxRing) {
        let Some(mtu) = self.notifier.connection_mtu() else {
            let dropped = tx.discard_pending();
            warn!("GATT RPC: no active connection, dropping {} queued bytes", dropped);
            return;
        };

        let size = mtu.clamp(1, MAX_NOTIFY_SIZE);
        let mut chunk = [0u8; MAX_NOTIFY_SIZE];
        loop {
            let n = tx.read(&mut chunk[..size]);
            if n == 0 {
                return;
            }
            self.send_chunk(&chunk[..n]);
        }
    }

    fn send_chunk(&self, data: &[u8]) {
        for attempt in 1..=self.notify_attempts {
            match self.notifier.notify(data) {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        "GATT RPC: notify failed ({}), attempt {}/{}",
                        e, attempt, self.notify_attempts
                    );
                    if attempt < self.notify_attempts && !self.retry_delay.is_zero() {
                        std::thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        warn!("GATT RPC: giving up on {}-byte notification", data.len());
    }
}

impl RpcTransport for GattTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    fn start_receive(&mut self) -> Result<(), TransportError> {
        self.link.receiving.store(true, Ordering::Release);
        Ok(())
    }

    fn stop_receive(&mut self) {
        self.link.receiving.store(false, Ordering::Release);
    }

    fn open_tx_session(&mut self) {
        let notify_size = self.notifier.connection_mtu().unwrap_or(DEFAULT_MTU);
        self.state = GattWriteState {
            notify_size,
            pending_notify: 0,
        };
        info!("GATT RPC: TX session opened (notify size {})", notify_size);
    }

    fn notify_tx(&mut self, tx: &TxRing, added: usize, message_done: bool) {
        self.state.pending_notify += added;
        if message_done || self.state.pending_notify > self.state.notify_size {
            self.flush(tx);
            self.state.pending_notify = 0;
        }
    }
}
