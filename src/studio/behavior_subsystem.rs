//! Behaviors subsystem: enumerate bound behaviors and describe their
//! parameters so a studio client can build binding editors.
//!
//! Behavior metadata lives with the behavior drivers; this module only
//! sees it through the [`BehaviorCatalog`] port. Behavior ids are catalog
//! indices.

use std::sync::Arc;

use heapless::String;
use log::warn;

use crate::error::Result;
use crate::rpc::proto::{
    BehaviorDetails, BehaviorParameters, BehaviorsRequest, BehaviorsResponse, CustomParameterSet,
    ErrorCondition, HandlerKey, MAX_BEHAVIORS, Request, ResponseBody, StandardDomain,
    SubsystemId, SubsystemRequest, ValueDescription, ValueType,
};
use crate::rpc::service::RpcService;

// ── Catalog port ─────────────────────────────────────────────

/// Which binding parameter a custom value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamPosition {
    First,
    Second,
}

#[derive(Debug, Clone, Copy)]
pub struct ValueMetadata {
    pub display_name: Option<&'static str>,
    pub position: ParamPosition,
    pub value: ValueType,
}

#[derive(Debug, Clone, Copy)]
pub struct CustomSetMetadata {
    pub values: &'static [ValueMetadata],
}

#[derive(Debug, Clone, Copy)]
pub enum ParameterMetadata {
    Standard {
        param1: StandardDomain,
        param2: StandardDomain,
    },
    Custom(&'static [CustomSetMetadata]),
}

#[derive(Debug, Clone, Copy)]
pub struct BehaviorRef {
    pub display_name: &'static str,
    pub parameters: ParameterMetadata,
}

/// Read-only access to the behaviors compiled into the firmware.
pub trait BehaviorCatalog: Send + Sync {
    fn count(&self) -> usize;
    fn get(&self, id: u32) -> Option<&BehaviorRef>;
}

/// Catalog backed by a static table.
pub struct StaticBehaviorCatalog(pub &'static [BehaviorRef]);

impl BehaviorCatalog for StaticBehaviorCatalog {
    fn count(&self) -> usize {
        self.0.len()
    }

    fn get(&self, id: u32) -> Option<&BehaviorRef> {
        self.0.get(id as usize)
    }
}

// ── Handlers ─────────────────────────────────────────────────

/// Register the behaviors subsystem. Details are secured, the listing is not.
pub fn install(service: &mut RpcService, catalog: Arc<dyn BehaviorCatalog>) -> Result<()> {
    let dispatcher = service.dispatcher_mut();
    dispatcher.register_subsystem(SubsystemId::Behaviors)?;

    let cat = catalog.clone();
    dispatcher.register_handler(
        HandlerKey::new(SubsystemId::Behaviors, BehaviorsRequest::LIST_ALL_BEHAVIORS),
        false,
        move |_: &Request| list_all_behaviors(cat.as_ref()),
    )?;

    dispatcher.register_handler(
        HandlerKey::new(SubsystemId::Behaviors, BehaviorsRequest::GET_BEHAVIOR_DETAILS),
        true,
        move |req: &Request| match req.subsystem {
            SubsystemRequest::Behaviors(BehaviorsRequest::GetBehaviorDetails { behavior_id }) => {
                get_behavior_details(catalog.as_ref(), behavior_id)
            }
            _ => ResponseBody::error(ErrorCondition::Generic),
        },
    )?;
    Ok(())
}

pub fn list_all_behaviors(catalog: &dyn BehaviorCatalog) -> ResponseBody {
    let count = catalog.count();
    if count > MAX_BEHAVIORS {
        warn!("RPC: {} behaviors, listing first {}", count, MAX_BEHAVIORS);
    }
    let ids = (0..count.min(MAX_BEHAVIORS) as u32).collect();
    ResponseBody::Behaviors(BehaviorsResponse::ListAllBehaviors(ids))
}

pub fn get_behavior_details(catalog: &dyn BehaviorCatalog, behavior_id: u32) -> ResponseBody {
    let Some(behavior) = catalog.get(behavior_id) else {
        return ResponseBody::error(ErrorCondition::Generic);
    };

    let parameters = match behavior.parameters {
        ParameterMetadata::Standard { param1, param2 } => {
            if param1 == StandardDomain::Null && param2 == StandardDomain::Null {
                None
            } else {
                Some(BehaviorParameters::Standard { param1, param2 })
            }
        }
        ParameterMetadata::Custom(sets) => {
            let mut out = heapless::Vec::new();
            for set in sets {
                if out.push(custom_set(set)).is_err() {
                    warn!("RPC: behavior {} has too many parameter sets", behavior_id);
                    break;
                }
            }
            Some(BehaviorParameters::Custom(out))
        }
    };

    ResponseBody::Behaviors(BehaviorsResponse::GetBehaviorDetails(BehaviorDetails {
        id: behavior_id,
        friendly_name: truncated(behavior.display_name),
        parameters,
    }))
}

/// Split a set's values into the param1 / param2 lists by position.
fn custom_set(set: &CustomSetMetadata) -> CustomParameterSet {
    let mut out = CustomParameterSet::default();
    for v in set.values {
        let desc = ValueDescription {
            name: v.display_name.map(truncated),
            value: v.value,
        };
        let list = match v.position {
            ParamPosition::First => &mut out.param1,
            ParamPosition::Second => &mut out.param2,
        };
        if list.push(desc).is_err() {
            warn!("RPC: parameter value list full, truncating");
        }
    }
    out
}

/// Copy `s` into a bounded string, cutting at a char boundary if needed.
fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
