//! Core subsystem: lock state queries and transitions.
//!
//! None of these handlers are secured; a locked client must be able to
//! ask for the state and request an unlock.

use log::{debug, info};

use crate::config::UnlockPolicy;
use crate::error::Result;
use crate::events::{EventKind, StudioEvent};
use crate::rpc::notify::NotificationMapper;
use crate::rpc::proto::{
    CoreNotification, CoreRequest, CoreResponse, HandlerKey, Notification, Request, ResponseBody,
    SubsystemId,
};
use crate::rpc::service::RpcService;

/// Register the core handlers and the lock-state notification mapper.
pub fn install(service: &mut RpcService) -> Result<()> {
    let policy = service.config().unlock_policy;

    service.dispatcher_mut().register_subsystem(SubsystemId::Core)?;

    let lock = service.lock_machine().clone();
    service.dispatcher_mut().register_handler(
        HandlerKey::new(SubsystemId::Core, CoreRequest::GET_LOCK_STATE),
        false,
        move |_: &Request| ResponseBody::Core(CoreResponse::GetLockState(lock.state())),
    )?;

    let lock = service.lock_machine().clone();
    service.dispatcher_mut().register_handler(
        HandlerKey::new(SubsystemId::Core, CoreRequest::REQUEST_UNLOCK),
        false,
        move |req: &Request| {
            match policy {
                UnlockPolicy::Direct => {
                    info!("RPC[{}]: unlocking", req.request_id);
                    lock.unlock();
                }
                UnlockPolicy::Confirm => {
                    info!("RPC[{}]: unlock requested, awaiting confirmation", req.request_id);
                    lock.initiate_unlock();
                }
            }
            ResponseBody::no_response()
        },
    )?;

    let lock = service.lock_machine().clone();
    service.dispatcher_mut().register_handler(
        HandlerKey::new(SubsystemId::Core, CoreRequest::LOCK),
        false,
        move |req: &Request| {
            info!("RPC[{}]: locking", req.request_id);
            lock.lock();
            ResponseBody::no_response()
        },
    )?;

    service.mappers_mut().register(Box::new(CoreEventMapper));
    Ok(())
}

/// Lock transitions → `LockStateChanged` notifications.
pub struct CoreEventMapper;

impl NotificationMapper for CoreEventMapper {
    fn subscriptions(&self) -> &[EventKind] {
        &[EventKind::LockStateChanged]
    }

    fn map(&self, event: &StudioEvent) -> Option<Notification> {
        match event {
            StudioEvent::LockStateChanged(state) => {
                debug!("RPC: mapped lock state {:?}", state);
                Some(Notification::Core(CoreNotification::LockStateChanged(*state)))
            }
        }
    }
}
