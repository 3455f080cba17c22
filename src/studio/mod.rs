//! Studio subsystems and the lock that guards them.
//!
//! | Module               | Subsystem  | Requests                              |
//! |----------------------|------------|---------------------------------------|
//! | `core_subsystem`     | Core       | get_lock_state, request_unlock, lock  |
//! | `behavior_subsystem` | Behaviors  | list_all_behaviors, get_behavior_details (secured) |
//!
//! Each subsystem exposes an `install` function that registers its
//! handlers (and mappers, if any) on an [`RpcService`](crate::rpc::service::RpcService).

pub mod behavior_subsystem;
pub mod core_subsystem;
pub mod lock;
