//! Mock transport and frame helpers for integration tests.
//!
//! `LoopbackTransport` drains the TX ring whenever a message completes
//! and keeps every byte it "sent", so tests can decode the full outbound
//! stream.

use std::sync::{Arc, Mutex};

use studio_rpc::TransportError;
use studio_rpc::config::RpcConfig;
use studio_rpc::rpc::channels::TxRing;
use studio_rpc::rpc::framing::{FrameDecoder, encode_frame};
use studio_rpc::rpc::proto::{Request, Response};
use studio_rpc::rpc::service::RpcService;
use studio_rpc::rpc::transport::{RpcTransport, TransportKind};
use studio_rpc::studio::behavior_subsystem::{
    self, BehaviorRef, ParameterMetadata, StaticBehaviorCatalog,
};
use studio_rpc::studio::core_subsystem;
use studio_rpc::rpc::proto::StandardDomain;

pub type Wire = Arc<Mutex<Vec<u8>>>;

pub struct LoopbackTransport {
    pub kind: TransportKind,
    pub wire: Wire,
}

impl RpcTransport for LoopbackTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn start_receive(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn stop_receive(&mut self) {}

    fn notify_tx(&mut self, tx: &TxRing, _added: usize, message_done: bool) {
        if !message_done && tx.free() > 0 {
            return;
        }
        let mut buf = [0u8; 64];
        loop {
            let n = tx.read(&mut buf);
            if n == 0 {
                break;
            }
            self.wire.lock().unwrap().extend_from_slice(&buf[..n]);
        }
    }
}

pub static BEHAVIORS: [BehaviorRef; 2] = [
    BehaviorRef {
        display_name: "Key Press",
        parameters: ParameterMetadata::Standard {
            param1: StandardDomain::HidUsage,
            param2: StandardDomain::Null,
        },
    },
    BehaviorRef {
        display_name: "Momentary Layer",
        parameters: ParameterMetadata::Standard {
            param1: StandardDomain::LayerIndex,
            param2: StandardDomain::Null,
        },
    },
];

/// A service with both subsystems installed and a loopback USB transport
/// already selected.
pub fn studio_service(config: RpcConfig) -> (RpcService, Wire) {
    let wire: Wire = Arc::default();
    let mut svc = RpcService::new(config).unwrap();
    core_subsystem::install(&mut svc).unwrap();
    behavior_subsystem::install(&mut svc, Arc::new(StaticBehaviorCatalog(&BEHAVIORS))).unwrap();
    svc.transports_mut()
        .register(Box::new(LoopbackTransport {
            kind: TransportKind::Usb,
            wire: wire.clone(),
        }))
        .unwrap();
    svc.select_transport(Some(TransportKind::Usb)).unwrap();
    (svc, wire)
}

pub fn frame(request: &Request) -> Vec<u8> {
    let payload = postcard::to_allocvec(request).unwrap();
    let mut out = vec![0u8; 2 * payload.len() + 2];
    let n = encode_frame(&payload, &mut out).unwrap();
    out.truncate(n);
    out
}

/// Decode and clear everything sent so far.
pub fn take_responses(wire: &Wire) -> Vec<Response> {
    let bytes = std::mem::take(&mut *wire.lock().unwrap());
    let mut dec = FrameDecoder::<512>::new();
    bytes
        .into_iter()
        .filter_map(|b| dec.push(b).map(|p| postcard::from_bytes(p).unwrap()))
        .collect()
}
