//! RPC service: the message pipeline owned by the worker.
//!
//! ```text
//!   RX ring ──▶ FrameDecoder ──▶ decode ──▶ DispatchRegistry ──┐
//!                                             (lock check)     │
//!                                                              ▼
//!   events ──▶ MapperRegistry ──────────────────────────▶ FrameWriter ──▶ TX ring
//! ```
//!
//! Every request is answered before the events it caused are mapped, so
//! a client sees a response ahead of the notifications its request
//! triggered.

use std::sync::Arc;

use heapless::Vec;
use log::{debug, info, warn};
use serde::Serialize;

use super::channels::{EventPublisher, RX_BUF_SIZE, RpcChannels};
use super::dispatch::DispatchRegistry;
use super::framing::FrameDecoder;
use super::idle::IdleLockTimer;
use super::notify::MapperRegistry;
use super::pipeline::write_message;
use super::proto::{
    ErrorCondition, MetaResponse, Notification, RequestResponse, Response, ResponseBody,
    decode_request,
};
use super::transport::{TransportKind, TransportRegistry};
use crate::config::RpcConfig;
use crate::error::Result;
use crate::studio::lock::{LockState, LockStateMachine};

/// Largest decoded request payload.
pub const MAX_FRAME_SIZE: usize = RX_BUF_SIZE;

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RpcStats {
    pub frames_received: u32,
    pub decode_failures: u32,
    pub requests_dispatched: u32,
    pub unlock_required: u32,
    pub not_found: u32,
    pub responses_sent: u32,
    pub notifications_sent: u32,
    pub tx_dropped: u32,
}

pub struct RpcService {
    config: RpcConfig,
    channels: Arc<RpcChannels>,
    lock: Arc<LockStateMachine>,
    dispatcher: DispatchRegistry,
    mappers: MapperRegistry,
    transports: TransportRegistry,
    decoder: FrameDecoder<MAX_FRAME_SIZE>,
    idle: IdleLockTimer,
    stats: RpcStats,
}

impl RpcService {
    /// Build an empty service; subsystems, mappers and transports are
    /// registered afterwards.
    pub fn new(config: RpcConfig) -> Result<Self> {
        config.validate()?;
        let channels = Arc::new(RpcChannels::new());
        let lock = Arc::new(LockStateMachine::new(
            config.initial_lock_state,
            channels.clone(),
        ));
        info!(
            "RPC: service created (lock {:?}, unlock {:?})",
            config.initial_lock_state, config.unlock_policy
        );
        Ok(Self {
            idle: IdleLockTimer::new(config.idle_lock_timeout_secs),
            config,
            channels,
            lock,
            dispatcher: DispatchRegistry::new(),
            mappers: MapperRegistry::new(),
            transports: TransportRegistry::new(),
            decoder: FrameDecoder::new(),
            stats: RpcStats::default(),
        })
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    pub fn channels(&self) -> &Arc<RpcChannels> {
        &self.channels
    }

    pub fn lock_machine(&self) -> &Arc<LockStateMachine> {
        &self.lock
    }

    pub fn dispatcher(&self) -> &DispatchRegistry {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut DispatchRegistry {
        &mut self.dispatcher
    }

    pub fn mappers_mut(&mut self) -> &mut MapperRegistry {
        &mut self.mappers
    }

    pub fn transports_mut(&mut self) -> &mut TransportRegistry {
        &mut self.transports
    }

    pub fn active_transport(&self) -> Option<TransportKind> {
        self.transports.active_kind()
    }

    pub fn stats(&self) -> RpcStats {
        self.stats
    }

    pub fn idle_lock_enabled(&self) -> bool {
        self.idle.is_enabled()
    }

    /// Async event producer bounded by `event_enqueue_timeout_ms`.
    pub fn event_publisher(&self) -> EventPublisher {
        EventPublisher::new(
            self.channels.clone(),
            embassy_time::Duration::from_millis(u64::from(self.config.event_enqueue_timeout_ms)),
        )
    }

    // ── Transport selection ──────────────────────────────────

    /// Switch the active transport (`None` = disconnected).
    ///
    /// Any half-received frame and unread RX bytes belong to the old
    /// session and are dropped.
    pub fn select_transport(&mut self, kind: Option<TransportKind>) -> Result<()> {
        let previous = self.transports.active_kind();
        if previous.is_some() && previous != kind && self.config.lock_on_disconnect {
            info!("RPC: {:?} disconnected, locking", previous);
            self.lock.lock();
        }

        self.decoder.reset();
        let stale = self.channels.rx.discard_pending();
        if stale > 0 {
            debug!("RPC: discarded {} stale RX bytes", stale);
        }

        self.transports.select(kind)?;
        self.channels.rx_notify();
        Ok(())
    }

    // ── Worker entry points ──────────────────────────────────

    /// Apply queued transport changes, then drain RX and pending events.
    /// Called by the worker on every wake.
    pub fn poll(&mut self) {
        self.apply_transport_requests();
        self.process_rx();
        self.process_events();
    }

    /// Select every transport requested through
    /// [`RpcChannels::request_transport`], oldest first.
    pub fn apply_transport_requests(&mut self) {
        while let Some(kind) = self.channels.try_next_transport_request() {
            if let Err(e) = self.select_transport(kind) {
                warn!("RPC: cannot select {:?}: {}", kind, e);
            }
        }
    }

    /// Advance the idle auto-lock by `delta_ms`.
    pub fn tick(&mut self, delta_ms: u64) {
        if self.idle.tick(delta_ms) && self.lock.state() != LockState::Locked {
            info!("RPC: idle timeout, locking");
            self.lock.lock();
        }
    }

    /// Feed every byte currently in the RX ring through the framing decoder.
    pub fn process_rx(&mut self) {
        let mut scratch = [0u8; 64];
        loop {
            let n = self.channels.rx.read(&mut scratch);
            if n == 0 {
                return;
            }
            for &byte in &scratch[..n] {
                let frame: Option<Vec<u8, MAX_FRAME_SIZE>> = self
                    .decoder
                    .push(byte)
                    .and_then(|payload| Vec::from_slice(payload).ok());
                if let Some(frame) = frame {
                    self.handle_frame(&frame);
                }
            }
        }
    }

    /// Decode, dispatch and answer one complete frame payload.
    pub fn handle_frame(&mut self, payload: &[u8]) {
        self.stats.frames_received = self.stats.frames_received.wrapping_add(1);

        let request = match decode_request(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!("RPC: dropping {}-byte frame: {}", payload.len(), e);
                self.stats.decode_failures = self.stats.decode_failures.wrapping_add(1);
                return;
            }
        };

        self.idle.reset();
        self.stats.requests_dispatched = self.stats.requests_dispatched.wrapping_add(1);
        debug!("RPC[{}]: {:?}", request.request_id, request.subsystem);

        let body = self.dispatcher.dispatch(&request, self.lock.state());
        match body {
            ResponseBody::Meta(MetaResponse::SimpleError(ErrorCondition::UnlockRequired)) => {
                self.stats.unlock_required = self.stats.unlock_required.wrapping_add(1);
            }
            ResponseBody::Meta(MetaResponse::SimpleError(ErrorCondition::RpcNotFound)) => {
                self.stats.not_found = self.stats.not_found.wrapping_add(1);
            }
            _ => {}
        }

        let response = Response::RequestResponse(RequestResponse {
            request_id: request.request_id,
            body,
        });
        if self.send(&response) {
            self.stats.responses_sent = self.stats.responses_sent.wrapping_add(1);
        }

        self.process_events();
    }

    /// Map queued events to notifications and send them.
    ///
    /// While no transport is active, events stay queued (bounded by the
    /// queue's drop-oldest policy) for the next one.
    pub fn process_events(&mut self) {
        if self.transports.active_kind().is_none() {
            return;
        }
        while let Some(event) = self.channels.try_next_event() {
            let notifications: std::vec::Vec<Notification> =
                self.mappers.map_event(&event).collect();
            for n in notifications {
                if self.send(&Response::Notification(n)) {
                    self.stats.notifications_sent =
                        self.stats.notifications_sent.wrapping_add(1);
                }
            }
        }
    }

    fn send(&mut self, response: &Response) -> bool {
        let Some(transport) = self.transports.active_mut() else {
            debug!("RPC: no active transport, dropping outbound message");
            self.stats.tx_dropped = self.stats.tx_dropped.wrapping_add(1);
            return false;
        };
        match write_message(
            &self.channels.tx,
            transport,
            embassy_time::Duration::from_millis(u64::from(self.config.tx_full_timeout_ms)),
            response,
        ) {
            Ok(_) => true,
            Err(e) => {
                warn!("RPC: outbound message dropped: {}", e);
                self.stats.tx_dropped = self.stats.tx_dropped.wrapping_add(1);
                false
            }
        }
    }
}
