//! Byte stream → request → response, across transports and adapters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use studio_rpc::adapters::uart_transport::{UartDriver, UartTransport};
use studio_rpc::config::RpcConfig;
use studio_rpc::rpc::framing::FrameDecoder;
use studio_rpc::rpc::proto::{
    BehaviorsRequest, BehaviorsResponse, CoreRequest, CoreResponse, ErrorCondition, Request,
    RequestResponse, Response, ResponseBody, SubsystemRequest,
};
use studio_rpc::rpc::service::RpcService;
use studio_rpc::rpc::transport::TransportKind;
use studio_rpc::studio::core_subsystem;
use studio_rpc::studio::lock::LockState;

use super::mock_transport::{frame, studio_service, take_responses};

fn core(request_id: u32, r: CoreRequest) -> Request {
    Request {
        request_id,
        subsystem: SubsystemRequest::Core(r),
    }
}

#[test]
fn escaped_example_frame_reaches_decoder_intact() {
    let mut dec = FrameDecoder::<16>::new();
    let payload = [0xAB, 0x01, 0x02, 0xAC, 0xAB, 0x03, 0xAD]
        .into_iter()
        .find_map(|b| dec.push(b).map(<[u8]>::to_vec));
    assert_eq!(payload, Some(vec![0x01, 0x02, 0xAB, 0x03]));

    // That payload is not a valid request: the service drops it silently.
    let (mut svc, wire) = studio_service(RpcConfig::default());
    svc.channels().rx.write(&[0xAB, 0x01, 0x02, 0xAC, 0xAB, 0x03, 0xAD]);
    svc.poll();
    assert!(take_responses(&wire).is_empty());
    assert_eq!(svc.stats().frames_received, 1);
    assert_eq!(svc.stats().decode_failures, 1);
}

#[test]
fn pipelined_requests_answered_in_order() {
    let (mut svc, wire) = studio_service(RpcConfig::default());
    let mut bytes = frame(&core(1, CoreRequest::GetLockState));
    bytes.extend(frame(&Request {
        request_id: 2,
        subsystem: SubsystemRequest::Behaviors(BehaviorsRequest::ListAllBehaviors),
    }));
    svc.channels().rx.write(&bytes);
    svc.poll();

    assert_eq!(
        take_responses(&wire),
        vec![
            Response::RequestResponse(RequestResponse {
                request_id: 1,
                body: ResponseBody::Core(CoreResponse::GetLockState(LockState::Locked)),
            }),
            Response::RequestResponse(RequestResponse {
                request_id: 2,
                body: ResponseBody::Behaviors(BehaviorsResponse::ListAllBehaviors(
                    heapless::Vec::from_slice(&[0, 1]).unwrap()
                )),
            }),
        ]
    );
}

#[test]
fn garbage_between_frames_does_not_desync() {
    let (mut svc, wire) = studio_service(RpcConfig::default());
    let mut bytes = vec![0x00, 0x13, 0xAD];
    bytes.extend(frame(&core(5, CoreRequest::GetLockState)));
    svc.channels().rx.write(&bytes);
    svc.poll();

    let responses = take_responses(&wire);
    assert_eq!(responses.len(), 1);
    assert!(matches!(
        responses[0],
        Response::RequestResponse(RequestResponse { request_id: 5, .. })
    ));
}

#[test]
fn trailing_noise_after_frame_does_not_replay_request() {
    let (mut svc, wire) = studio_service(RpcConfig::default());
    let mut bytes = frame(&core(5, CoreRequest::GetLockState));
    bytes.push(0x00);
    svc.channels().rx.write(&bytes);
    svc.poll();
    svc.channels().rx.write(&[0x13, 0xAD]);
    svc.poll();

    assert_eq!(take_responses(&wire).len(), 1);
    assert_eq!(svc.stats().frames_received, 1);
    assert_eq!(svc.stats().requests_dispatched, 1);
}

#[test]
fn missing_subsystem_is_not_found() {
    let wire = Arc::default();
    let mut svc = RpcService::new(RpcConfig::default()).unwrap();
    core_subsystem::install(&mut svc).unwrap();
    svc.transports_mut()
        .register(Box::new(super::mock_transport::LoopbackTransport {
            kind: TransportKind::Ble,
            wire: Arc::clone(&wire),
        }))
        .unwrap();
    svc.select_transport(Some(TransportKind::Ble)).unwrap();

    svc.channels().rx.write(&frame(&Request {
        request_id: 8,
        subsystem: SubsystemRequest::Behaviors(BehaviorsRequest::ListAllBehaviors),
    }));
    svc.poll();

    assert_eq!(
        take_responses(&wire),
        vec![Response::RequestResponse(RequestResponse {
            request_id: 8,
            body: ResponseBody::error(ErrorCondition::RpcNotFound),
        })]
    );
}

// ── Serial adapter end to end ────────────────────────────────

#[derive(Default)]
struct FakeUart {
    rx_fifo: Mutex<VecDeque<u8>>,
    wire: Mutex<Vec<u8>>,
    tx_irq: AtomicBool,
}

impl UartDriver for FakeUart {
    fn read_fifo(&self, buf: &mut [u8]) -> usize {
        let mut fifo = self.rx_fifo.lock().unwrap();
        let n = buf.len().min(fifo.len());
        for (slot, b) in buf.iter_mut().zip(fifo.drain(..n)) {
            *slot = b;
        }
        n
    }

    fn fill_fifo(&self, data: &[u8]) -> usize {
        self.wire.lock().unwrap().extend_from_slice(data);
        data.len()
    }

    fn set_rx_irq(&self, _enabled: bool) {}

    fn set_tx_irq(&self, enabled: bool) {
        self.tx_irq.store(enabled, Ordering::SeqCst);
    }
}

#[test]
fn uart_round_trip() {
    let config = RpcConfig::default();
    let mut svc = RpcService::new(config.clone()).unwrap();
    core_subsystem::install(&mut svc).unwrap();

    let uart = Arc::new(FakeUart::default());
    let (transport, link) = UartTransport::new(svc.channels().clone(), uart.clone(), &config);
    svc.transports_mut().register(Box::new(transport)).unwrap();
    svc.select_transport(Some(TransportKind::Usb)).unwrap();

    // Bytes arrive in two interrupts, split mid-frame.
    let bytes = frame(&core(77, CoreRequest::GetLockState));
    let (a, b) = bytes.split_at(bytes.len() / 2);
    uart.rx_fifo.lock().unwrap().extend(a);
    link.on_rx_ready();
    svc.poll();
    uart.rx_fifo.lock().unwrap().extend(b);
    link.on_rx_ready();
    svc.poll();

    assert!(uart.tx_irq.load(Ordering::SeqCst));
    link.on_tx_ready();
    assert!(!uart.tx_irq.load(Ordering::SeqCst));

    let wire = uart.wire.lock().unwrap().clone();
    let mut dec = FrameDecoder::<64>::new();
    let response: Response = wire
        .into_iter()
        .find_map(|b| dec.push(b).map(|p| postcard::from_bytes(p).unwrap()))
        .unwrap();
    assert_eq!(
        response,
        Response::RequestResponse(RequestResponse {
            request_id: 77,
            body: ResponseBody::Core(CoreResponse::GetLockState(LockState::Locked)),
        })
    );
}
