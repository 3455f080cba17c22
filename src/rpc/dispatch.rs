//! Subsystem / handler dispatch with lock enforcement.
//!
//! Handlers are keyed by `(subsystem, request kind)` and kept in a table
//! sorted by that key, so lookup is a binary search and does not depend
//! on registration order. A handler registered as `secured` only runs
//! while the studio is unlocked; otherwise the client gets
//! `UnlockRequired` and the handler is never invoked.

use log::{debug, error};

use super::proto::{ErrorCondition, HandlerKey, Request, ResponseBody, SubsystemId};
use crate::error::RegistryError;
use crate::studio::lock::LockState;

/// Turns a request into a response body. Closures implement this.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &Request) -> ResponseBody;
}

impl<F> RequestHandler for F
where
    F: Fn(&Request) -> ResponseBody + Send + Sync,
{
    fn handle(&self, request: &Request) -> ResponseBody {
        self(request)
    }
}

struct HandlerDescriptor {
    key: HandlerKey,
    secured: bool,
    handler: Box<dyn RequestHandler>,
}

#[derive(Default)]
pub struct DispatchRegistry {
    subsystems: Vec<SubsystemId>,
    handlers: Vec<HandlerDescriptor>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_subsystem(&mut self, id: SubsystemId) -> Result<(), RegistryError> {
        if self.subsystems.contains(&id) {
            return Err(RegistryError::DuplicateSubsystem);
        }
        self.subsystems.push(id);
        Ok(())
    }

    pub fn register_handler<H>(
        &mut self,
        key: HandlerKey,
        secured: bool,
        handler: H,
    ) -> Result<(), RegistryError>
    where
        H: RequestHandler + 'static,
    {
        if !self.subsystems.contains(&key.subsystem) {
            return Err(RegistryError::UnknownSubsystem);
        }
        match self.handlers.binary_search_by_key(&key, |d| d.key) {
            Ok(_) => Err(RegistryError::DuplicateHandler),
            Err(pos) => {
                self.handlers.insert(
                    pos,
                    HandlerDescriptor {
                        key,
                        secured,
                        handler: Box::new(handler),
                    },
                );
                Ok(())
            }
        }
    }

    pub fn is_secured(&self, key: HandlerKey) -> Option<bool> {
        self.find(key).map(|d| d.secured)
    }

    /// Route `request` to its handler, enforcing the lock on secured handlers.
    pub fn dispatch(&self, request: &Request, lock_state: LockState) -> ResponseBody {
        let key = request.key();

        if !self.subsystems.contains(&key.subsystem) {
            error!("RPC: no subsystem registered for {:?}", key.subsystem);
            return ResponseBody::error(ErrorCondition::RpcNotFound);
        }

        let Some(desc) = self.find(key) else {
            error!("RPC: no handler for {:?}/{}", key.subsystem, key.kind);
            return ResponseBody::error(ErrorCondition::RpcNotFound);
        };

        if desc.secured && lock_state != LockState::Unlocked {
            debug!("RPC[{}]: {:?}/{} requires unlock", request.request_id, key.subsystem, key.kind);
            return ResponseBody::error(ErrorCondition::UnlockRequired);
        }

        desc.handler.handle(request)
    }

    fn find(&self, key: HandlerKey) -> Option<&HandlerDescriptor> {
        self.handlers
            .binary_search_by_key(&key, |d| d.key)
            .ok()
            .map(|i| &self.handlers[i])
    }
}
