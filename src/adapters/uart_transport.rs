//! Serial RPC transport — studio RPC over an interrupt-driven UART
//! (USB CDC-ACM on most boards).
//!
//! The UART interrupt handler calls into [`UartLink`]; the worker only
//! sees [`UartTransport`] through the `RpcTransport` trait.
//!
//! ```text
//!   RX IRQ ── on_rx_ready ──▶ RX ring ──▶ worker
//!   worker ──▶ TX ring ── notify_tx ──▶ enable TX IRQ ── on_tx_ready ──▶ FIFO
//! ```
//!
//! TX interrupts are enabled when a message is complete or when the TX
//! ring passes the configured watermark, so long messages start draining
//! before the ring fills.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::RpcConfig;
use crate::error::TransportError;
use crate::rpc::channels::{RX_BUF_SIZE, RpcChannels, TX_BUF_SIZE, TxRing};
use crate::rpc::transport::{RpcTransport, TransportKind};

/// Register-level access to the UART peripheral.
///
/// Called from interrupt context; implementations must not block.
pub trait UartDriver: Send + Sync {
    /// Move up to `buf.len()` bytes out of the RX FIFO. Returns the count.
    fn read_fifo(&self, buf: &mut [u8]) -> usize;
    /// Move up to `data.len()` bytes into the TX FIFO. Returns the count.
    fn fill_fifo(&self, data: &[u8]) -> usize;
    fn set_rx_irq(&self, enabled: bool);
    fn set_tx_irq(&self, enabled: bool);
}

// ── Interrupt-side handle ────────────────────────────────────

pub struct UartLink {
    channels: Arc<RpcChannels>,
    driver: Arc<dyn UartDriver>,
    receiving: AtomicBool,
}

impl UartLink {
    pub fn new(channels: Arc<RpcChannels>, driver: Arc<dyn UartDriver>) -> Self {
        Self {
            channels,
            driver,
            receiving: AtomicBool::new(false),
        }
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving.load(Ordering::Acquire)
    }

    /// RX-ready interrupt: read the FIFO until empty.
    ///
    /// Bytes are discarded while receive is stopped or the RX ring is full.
    pub fn on_rx_ready(&self) {
        if !self.is_receiving() {
            let mut sink = [0u8; 16];
            while self.driver.read_fifo(&mut sink) > 0 {}
            return;
        }

        let rx = &self.channels.rx;
        loop {
            let Some(mut grant) = rx.reserve_write(RX_BUF_SIZE) else {
                break;
            };
            if grant.is_empty() {
                drop(grant);
                warn!("UART RPC: RX ring full, dropping FIFO contents");
                let mut sink = [0u8; 16];
                while self.driver.read_fifo(&mut sink) > 0 {}
                break;
            }
            let n = self.driver.read_fifo(grant.buf());
            grant.commit(n);
            if n == 0 {
                break;
            }
        }

        self.channels.rx_notify();
    }

    /// TX-ready interrupt: move TX ring bytes into the FIFO until either
    /// runs out, then mask the interrupt once the ring is empty.
    ///
    /// A commit can land between the empty check and the mask; the ring is
    /// checked again afterwards so those bytes are not stranded.
    pub fn on_tx_ready(&self) {
        let tx = &self.channels.tx;
        loop {
            let Some(grant) = tx.claim_read(TX_BUF_SIZE) else {
                return;
            };
            if grant.is_empty() {
                drop(grant);
                self.driver.set_tx_irq(false);
                if !tx.is_empty() {
                    self.driver.set_tx_irq(true);
                }
                return;
            }
            let len = grant.len();
            let sent = self.driver.fill_fifo(grant.buf());
            grant.release(sent);
            if sent < len {
                // FIFO full; the next TX-ready interrupt continues.
                return;
            }
        }
    }
}

// ── Worker-side transport ────────────────────────────────────

pub struct UartTransport {
    link: Arc<UartLink>,
    watermark: usize,
}

impl UartTransport {
    /// Returns the transport for the registry and the link for the IRQ handler.
    pub fn new(
        channels: Arc<RpcChannels>,
        driver: Arc<dyn UartDriver>,
        config: &RpcConfig,
    ) -> (Self, Arc<UartLink>) {
        let link = Arc::new(UartLink::new(channels, driver));
        let watermark = TX_BUF_SIZE * usize::from(config.uart_tx_watermark_percent) / 100;
        (
            Self {
                link: link.clone(),
                watermark,
            },
            link,
        )
    }
}

impl RpcTransport for UartTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Usb
    }

    fn start_receive(&mut self) -> Result<(), TransportError> {
        self.link.receiving.store(true, Ordering::Release);
        self.link.driver.set_rx_irq(true);
        debug!("UART RPC: receive started");
        Ok(())
    }

    fn stop_receive(&mut self) {
        self.link.receiving.store(false, Ordering::Release);
        debug!("UART RPC: receive stopped");
    }

    fn notify_tx(&mut self, tx: &TxRing, _added: usize, message_done: bool) {
        if message_done || tx.len() > self.watermark {
            self.link.driver.set_tx_irq(true);
        }
    }
}
