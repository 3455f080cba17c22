//! Lock gating and lock-state notifications seen from the wire.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use studio_rpc::config::{RpcConfig, UnlockPolicy};
use studio_rpc::rpc::proto::{
    BehaviorsRequest, CoreNotification, CoreRequest, ErrorCondition, HandlerKey, MetaResponse,
    Notification, Request, RequestResponse, Response, ResponseBody, SubsystemId,
    SubsystemRequest,
};
use studio_rpc::rpc::service::RpcService;
use studio_rpc::rpc::transport::TransportKind;
use studio_rpc::studio::core_subsystem;
use studio_rpc::studio::lock::LockState;

use super::mock_transport::{LoopbackTransport, Wire, frame, studio_service, take_responses};

fn core(request_id: u32, r: CoreRequest) -> Request {
    Request {
        request_id,
        subsystem: SubsystemRequest::Core(r),
    }
}

fn lock_changed(state: LockState) -> Response {
    Response::Notification(Notification::Core(CoreNotification::LockStateChanged(state)))
}

fn no_response(request_id: u32) -> Response {
    Response::RequestResponse(RequestResponse {
        request_id,
        body: ResponseBody::Meta(MetaResponse::NoResponse),
    })
}

/// Core subsystem plus a secured behaviors handler that counts its calls.
fn counting_service(config: RpcConfig) -> (RpcService, Wire, Arc<AtomicU32>) {
    let wire = Wire::default();
    let calls = Arc::new(AtomicU32::new(0));
    let mut svc = RpcService::new(config).unwrap();
    core_subsystem::install(&mut svc).unwrap();

    let dispatcher = svc.dispatcher_mut();
    dispatcher.register_subsystem(SubsystemId::Behaviors).unwrap();
    let counter = calls.clone();
    dispatcher
        .register_handler(
            HandlerKey::new(SubsystemId::Behaviors, BehaviorsRequest::GET_BEHAVIOR_DETAILS),
            true,
            move |_: &Request| {
                counter.fetch_add(1, Ordering::SeqCst);
                ResponseBody::error(ErrorCondition::Generic)
            },
        )
        .unwrap();

    svc.transports_mut()
        .register(Box::new(LoopbackTransport {
            kind: TransportKind::Usb,
            wire: wire.clone(),
        }))
        .unwrap();
    svc.select_transport(Some(TransportKind::Usb)).unwrap();
    (svc, wire, calls)
}

fn details(request_id: u32) -> Request {
    Request {
        request_id,
        subsystem: SubsystemRequest::Behaviors(BehaviorsRequest::GetBehaviorDetails {
            behavior_id: 0,
        }),
    }
}

#[test]
fn secured_handler_never_runs_while_locked() {
    let (mut svc, wire, calls) = counting_service(RpcConfig::default());

    svc.channels().rx.write(&frame(&details(1)));
    svc.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        take_responses(&wire),
        vec![Response::RequestResponse(RequestResponse {
            request_id: 1,
            body: ResponseBody::error(ErrorCondition::UnlockRequired),
        })]
    );
    assert_eq!(svc.stats().unlock_required, 1);
}

#[test]
fn unlock_then_secured_request_succeeds() {
    let (mut svc, wire, calls) = counting_service(RpcConfig::default());

    let mut bytes = frame(&core(1, CoreRequest::RequestUnlock));
    bytes.extend(frame(&details(2)));
    svc.channels().rx.write(&bytes);
    svc.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let responses = take_responses(&wire);
    assert_eq!(responses.len(), 3);
    // The response goes out before the notification its request caused.
    assert_eq!(responses[0], no_response(1));
    assert_eq!(responses[1], lock_changed(LockState::Unlocked));
    assert_eq!(
        responses[2],
        Response::RequestResponse(RequestResponse {
            request_id: 2,
            body: ResponseBody::error(ErrorCondition::Generic),
        })
    );
}

#[test]
fn confirmed_unlock_emits_ordered_notifications() {
    let config = RpcConfig {
        unlock_policy: UnlockPolicy::Confirm,
        ..RpcConfig::default()
    };
    let (mut svc, wire) = studio_service(config);

    svc.channels().rx.write(&frame(&core(4, CoreRequest::RequestUnlock)));
    svc.poll();
    assert_eq!(svc.lock_machine().state(), LockState::Unlocking);

    // Local confirmation arrives from outside the worker.
    svc.lock_machine().complete_unlock();
    svc.lock_machine().lock();
    svc.poll();

    assert_eq!(
        take_responses(&wire),
        vec![
            no_response(4),
            lock_changed(LockState::Unlocking),
            lock_changed(LockState::Unlocked),
            lock_changed(LockState::Locked),
        ]
    );
}

#[test]
fn lock_then_two_phase_unlock_reaches_client_in_order() {
    let (mut svc, wire) = studio_service(RpcConfig::default());
    let lock = svc.lock_machine().clone();

    lock.lock();
    lock.initiate_unlock();
    lock.complete_unlock();
    svc.poll();

    assert_eq!(
        take_responses(&wire),
        vec![
            lock_changed(LockState::Locked),
            lock_changed(LockState::Unlocking),
            lock_changed(LockState::Unlocked),
        ]
    );
    assert_eq!(svc.stats().notifications_sent, 3);
}

#[test]
fn lock_request_relocks() {
    let config = RpcConfig {
        initial_lock_state: LockState::Unlocked,
        ..RpcConfig::default()
    };
    let (mut svc, wire) = studio_service(config);

    let mut bytes = frame(&core(1, CoreRequest::Lock));
    bytes.extend(frame(&core(2, CoreRequest::GetLockState)));
    svc.channels().rx.write(&bytes);
    svc.poll();

    let responses = take_responses(&wire);
    assert_eq!(responses[0], no_response(1));
    assert_eq!(responses[1], lock_changed(LockState::Locked));
    assert!(matches!(
        &responses[2],
        Response::RequestResponse(RequestResponse { request_id: 2, .. })
    ));
    assert_eq!(svc.lock_machine().state(), LockState::Locked);
}

#[test]
fn disconnect_locks_and_notifies_next_transport() {
    let config = RpcConfig {
        initial_lock_state: LockState::Unlocked,
        ..RpcConfig::default()
    };
    let (mut svc, usb_wire) = studio_service(config);
    let ble_wire = Wire::default();
    svc.transports_mut()
        .register(Box::new(LoopbackTransport {
            kind: TransportKind::Ble,
            wire: ble_wire.clone(),
        }))
        .unwrap();

    svc.select_transport(Some(TransportKind::Ble)).unwrap();
    svc.poll();

    assert_eq!(svc.lock_machine().state(), LockState::Locked);
    assert!(take_responses(&usb_wire).is_empty());
    assert_eq!(take_responses(&ble_wire), vec![lock_changed(LockState::Locked)]);
}

#[test]
fn idle_timeout_locks() {
    let config = RpcConfig {
        initial_lock_state: LockState::Unlocked,
        idle_lock_timeout_secs: 2,
        ..RpcConfig::default()
    };
    let (mut svc, wire) = studio_service(config);
    assert!(svc.idle_lock_enabled());

    svc.tick(1_500);
    // Any decoded request restarts the countdown.
    svc.channels().rx.write(&frame(&core(1, CoreRequest::GetLockState)));
    svc.poll();
    svc.tick(1_500);
    assert_eq!(svc.lock_machine().state(), LockState::Unlocked);

    svc.tick(600);
    svc.poll();
    assert_eq!(svc.lock_machine().state(), LockState::Locked);
    assert_eq!(
        take_responses(&wire).last(),
        Some(&lock_changed(LockState::Locked))
    );
}
