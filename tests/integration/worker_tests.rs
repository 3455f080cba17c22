//! The worker thread serving requests end to end.

use std::time::{Duration, Instant};

use studio_rpc::config::RpcConfig;
use studio_rpc::events::StudioEvent;
use studio_rpc::rpc::proto::{
    CoreNotification, CoreRequest, CoreResponse, Notification, Request, RequestResponse, Response,
    ResponseBody, SubsystemRequest,
};
use studio_rpc::rpc::transport::TransportKind;
use studio_rpc::rpc::worker;
use studio_rpc::studio::lock::LockState;

use super::mock_transport::{LoopbackTransport, Wire, frame, studio_service, take_responses};

fn wait_for_bytes(wire: &Wire) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !wire.lock().unwrap().is_empty() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn worker_answers_and_shuts_down() {
    let (svc, wire) = studio_service(RpcConfig::default());
    let channels = svc.channels().clone();
    let handle = worker::spawn(svc).unwrap();

    channels.rx.write(&frame(&Request {
        request_id: 11,
        subsystem: SubsystemRequest::Core(CoreRequest::GetLockState),
    }));
    channels.rx_notify();
    assert!(wait_for_bytes(&wire));

    channels.shutdown();
    let svc = handle.join().unwrap();

    assert_eq!(
        take_responses(&wire),
        vec![Response::RequestResponse(RequestResponse {
            request_id: 11,
            body: ResponseBody::Core(CoreResponse::GetLockState(LockState::Locked)),
        })]
    );
    assert_eq!(svc.stats().responses_sent, 1);
}

#[test]
fn worker_runs_idle_lock_without_traffic() {
    let config = RpcConfig {
        initial_lock_state: LockState::Unlocked,
        idle_lock_timeout_secs: 1,
        ..RpcConfig::default()
    };
    let (svc, wire) = studio_service(config);
    let channels = svc.channels().clone();
    let handle = worker::spawn(svc).unwrap();

    assert!(wait_for_bytes(&wire));
    channels.shutdown();
    let svc = handle.join().unwrap();

    assert_eq!(svc.lock_machine().state(), LockState::Locked);
    assert_eq!(svc.stats().notifications_sent, 1);
}

#[test]
fn worker_switches_transport_on_request() {
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
    let channels = svc.channels().clone();
    let handle = worker::spawn(svc).unwrap();

    // Leaving USB locks; the notification goes out on BLE.
    assert!(channels.request_transport(Some(TransportKind::Ble)));
    assert!(wait_for_bytes(&ble_wire));
    assert_eq!(
        take_responses(&ble_wire),
        vec![Response::Notification(Notification::Core(
            CoreNotification::LockStateChanged(LockState::Locked)
        ))]
    );

    channels.rx.write(&frame(&Request {
        request_id: 12,
        subsystem: SubsystemRequest::Core(CoreRequest::GetLockState),
    }));
    channels.rx_notify();
    assert!(wait_for_bytes(&ble_wire));

    channels.shutdown();
    let svc = handle.join().unwrap();

    assert_eq!(svc.active_transport(), Some(TransportKind::Ble));
    assert!(take_responses(&usb_wire).is_empty());
    assert_eq!(
        take_responses(&ble_wire),
        vec![Response::RequestResponse(RequestResponse {
            request_id: 12,
            body: ResponseBody::Core(CoreResponse::GetLockState(LockState::Locked)),
        })]
    );
}

#[test]
fn published_event_reaches_client() {
    let (svc, wire) = studio_service(RpcConfig::default());
    let channels = svc.channels().clone();
    let publisher = svc.event_publisher();
    let handle = worker::spawn(svc).unwrap();

    futures_lite::future::block_on(
        publisher.publish(StudioEvent::LockStateChanged(LockState::Unlocking)),
    );
    assert!(wait_for_bytes(&wire));

    channels.shutdown();
    handle.join().unwrap();
    assert_eq!(
        take_responses(&wire),
        vec![Response::Notification(Notification::Core(
            CoreNotification::LockStateChanged(LockState::Unlocking)
        ))]
    );
}
