//! Fuzz target: request decode + dispatch
//!
//! Feeds arbitrary frame payloads through a fully installed, locked
//! service. Undecodable input must be dropped quietly; decodable input
//! must never run a secured handler.
//!
//! cargo fuzz run fuzz_dispatch

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use studio_rpc::config::RpcConfig;
use studio_rpc::rpc::proto::{ErrorCondition, HandlerKey, ResponseBody, decode_request};
use studio_rpc::rpc::service::RpcService;
use studio_rpc::studio::behavior_subsystem::{self, StaticBehaviorCatalog};
use studio_rpc::studio::core_subsystem;
use studio_rpc::studio::lock::LockState;

fuzz_target!(|data: &[u8]| {
    let mut svc = RpcService::new(RpcConfig::default()).expect("default config is valid");
    core_subsystem::install(&mut svc).expect("core installs");
    behavior_subsystem::install(&mut svc, Arc::new(StaticBehaviorCatalog(&[])))
        .expect("behaviors install");

    let Ok(request) = decode_request(data) else {
        svc.handle_frame(data);
        assert_eq!(svc.stats().decode_failures, 1);
        return;
    };

    let key: HandlerKey = request.key();
    let body = svc.dispatcher().dispatch(&request, LockState::Locked);
    if svc.dispatcher().is_secured(key) == Some(true) {
        assert_eq!(body, ResponseBody::error(ErrorCondition::UnlockRequired));
    }

    // Round-trip stability of the decoded request.
    let bytes = postcard::to_allocvec(&request).expect("encodes");
    assert_eq!(decode_request(&bytes), Ok(request));
});
