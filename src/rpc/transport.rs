//! Transport abstraction and registry.
//!
//! Concrete implementations:
//! - Serial link (USB CDC-ACM UART)
//! - BLE GATT characteristic (write + notify)
//!
//! Every transport shares the same RX/TX rings; the message pipeline is
//! independent of the carrier, so adding a transport requires zero
//! changes to the RPC logic. Exactly one transport is active at a time.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::channels::TxRing;
use crate::error::{RegistryError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Usb,
    Ble,
}

/// A physical carrier for studio RPC traffic.
///
/// All methods run on the RPC worker thread. Driver callbacks that run in
/// other contexts (RX interrupts, BT host callbacks) reach the rings
/// through their own shared handle, never through this object.
pub trait RpcTransport: Send {
    fn kind(&self) -> TransportKind;

    /// Begin copying inbound bytes into the RX ring.
    fn start_receive(&mut self) -> Result<(), TransportError>;

    /// Stop copying inbound bytes. Must be idempotent.
    fn stop_receive(&mut self);

    /// Reset per-connection TX bookkeeping. Called on every selection.
    fn open_tx_session(&mut self) {}

    /// `added` bytes were just committed to `tx`; `message_done` is set
    /// once the frame's EOF is in the ring.
    fn notify_tx(&mut self, tx: &TxRing, added: usize, message_done: bool);
}

#[derive(Default)]
pub struct TransportRegistry {
    transports: Vec<Box<dyn RpcTransport>>,
    active: Option<usize>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transport: Box<dyn RpcTransport>) -> Result<(), RegistryError> {
        let kind = transport.kind();
        if self.transports.iter().any(|t| t.kind() == kind) {
            return Err(RegistryError::DuplicateTransport);
        }
        info!("RPC: registered {:?} transport", kind);
        self.transports.push(transport);
        Ok(())
    }

    pub fn kinds(&self) -> impl Iterator<Item = TransportKind> + '_ {
        self.transports.iter().map(|t| t.kind())
    }

    pub fn active_kind(&self) -> Option<TransportKind> {
        self.active.map(|i| self.transports[i].kind())
    }

    pub fn active_mut(&mut self) -> Option<&mut (dyn RpcTransport + 'static)> {
        let i = self.active?;
        self.transports.get_mut(i).map(|t| t.as_mut())
    }

    /// Make `kind` the active transport, or deactivate all with `None`.
    ///
    /// The previous transport stops receiving first. If the new one fails
    /// to start, no transport is active afterwards.
    pub fn select(&mut self, kind: Option<TransportKind>) -> Result<(), TransportError> {
        if let Some(prev) = self.active.take() {
            let t = &mut self.transports[prev];
            t.stop_receive();
            info!("RPC: {:?} transport deselected", t.kind());
        }

        let Some(kind) = kind else {
            return Ok(());
        };

        let idx = self
            .transports
            .iter()
            .position(|t| t.kind() == kind)
            .ok_or(TransportError::NotRegistered)?;

        let t = &mut self.transports[idx];
        if let Err(e) = t.start_receive() {
            warn!("RPC: {:?} transport failed to start: {}", kind, e);
            return Err(e);
        }
        t.open_tx_session();
        self.active = Some(idx);
        info!("RPC: {:?} transport active", kind);
        Ok(())
    }
}
