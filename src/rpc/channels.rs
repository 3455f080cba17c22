//! RPC inter-context communication.
//!
//! One `RpcChannels` instance is shared by `Arc` between the transport
//! callbacks (interrupt / BT host context), firmware code that raises
//! events, and the RPC worker thread.
//!
//! ```text
//! ┌──────────────┐  RX ring   ┌──────────────┐  TX ring   ┌──────────────┐
//! │  Transport   │──────────▶│  RPC worker   │──────────▶│  Transport   │
//! │  RX callback │  + wake    │  (async)      │  + notify  │  TX drain    │
//! └──────────────┘            └──────▲───────┘            └──────────────┘
//!                                    │ events, transport requests + wake
//!                             ┌──────┴───────┐
//!                             │ Lock machine │
//!                             │ link monitor │
//!                             └──────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, with_timeout};
use log::warn;

use super::ring_buffer::RingBuffer;
use super::transport::TransportKind;
use crate::events::{EventSink, StudioEvent};

/// Inbound byte ring capacity.
pub const RX_BUF_SIZE: usize = 256;

/// Outbound byte ring capacity.
pub const TX_BUF_SIZE: usize = 256;

/// Pending studio events before the oldest is dropped.
const EVENT_QUEUE_DEPTH: usize = 8;

/// Pending transport selections (connect / disconnect edges).
const TRANSPORT_QUEUE_DEPTH: usize = 4;

pub type RxRing = RingBuffer<RX_BUF_SIZE>;
pub type TxRing = RingBuffer<TX_BUF_SIZE>;

pub struct RpcChannels {
    /// Transport → worker.
    pub rx: RxRing,
    /// Worker → transport.
    pub tx: TxRing,
    events: Channel<CriticalSectionRawMutex, StudioEvent, EVENT_QUEUE_DEPTH>,
    transport_requests: Channel<CriticalSectionRawMutex, Option<TransportKind>, TRANSPORT_QUEUE_DEPTH>,
    wake: Signal<CriticalSectionRawMutex, ()>,
    shutdown: AtomicBool,
    dropped_events: AtomicU32,
}

impl RpcChannels {
    pub const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            events: Channel::new(),
            transport_requests: Channel::new(),
            wake: Signal::new(),
            shutdown: AtomicBool::new(false),
            dropped_events: AtomicU32::new(0),
        }
    }

    /// Called by a transport after committing bytes to the RX ring.
    pub fn rx_notify(&self) {
        self.wake.signal(());
    }

    /// Wait until new RX bytes, an event or a shutdown request arrive.
    pub async fn wait(&self) {
        self.wake.wait().await;
    }

    pub fn try_next_event(&self) -> Option<StudioEvent> {
        self.events.try_receive().ok()
    }

    /// Ask the worker to make `kind` the active transport (`None` when the
    /// link went away). Requests are applied in order on the next pass.
    ///
    /// Returns `false` if the request queue is full.
    pub fn request_transport(&self, kind: Option<TransportKind>) -> bool {
        let queued = self.transport_requests.try_send(kind).is_ok();
        if !queued {
            warn!("RPC: transport request queue full, dropped {:?}", kind);
        }
        self.wake.signal(());
        queued
    }

    pub fn try_next_transport_request(&self) -> Option<Option<TransportKind>> {
        self.transport_requests.try_receive().ok()
    }

    /// Ask the worker to exit after its current pass.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.signal(());
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Events discarded because the queue was full.
    pub fn dropped_events(&self) -> u32 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Enqueue from an async context, waiting up to `timeout` for space
    /// before falling back to dropping the oldest queued event.
    pub async fn emit_with_timeout(&self, event: StudioEvent, timeout: Duration) {
        if with_timeout(timeout, self.events.send(event)).await.is_err() {
            warn!("RPC: event queue full after {} ms", timeout.as_millis());
            self.force_send(event);
        }
        self.wake.signal(());
    }

    fn force_send(&self, mut event: StudioEvent) {
        // One eviction always makes room for a single producer; a second
        // pass covers a racing producer refilling the slot.
        for _ in 0..2 {
            match self.events.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(e)) => {
                    event = e;
                    if let Ok(oldest) = self.events.try_receive() {
                        self.dropped_events.fetch_add(1, Ordering::Relaxed);
                        warn!("RPC: event queue full, dropped {:?}", oldest);
                    }
                }
            }
        }
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
        warn!("RPC: event queue contended, dropped {:?}", event);
    }
}

impl Default for RpcChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Async event producer with the configured enqueue timeout.
#[derive(Clone)]
pub struct EventPublisher {
    channels: Arc<RpcChannels>,
    timeout: Duration,
}

impl EventPublisher {
    pub fn new(channels: Arc<RpcChannels>, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn publish(&self, event: StudioEvent) {
        self.channels.emit_with_timeout(event, self.timeout).await;
    }
}

impl EventSink for RpcChannels {
    fn emit(&self, event: StudioEvent) {
        self.force_send(event);
        self.wake.signal(());
    }
}
