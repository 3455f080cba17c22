//! Studio RPC message schema.
//!
//! Messages are serde types encoded with postcard inside a frame. Enum
//! variants encode as varint indices, so variant order is part of the
//! wire contract: append, never reorder.
//!
//! ```text
//! Request ─┬─ request_id
//!          └─ SubsystemRequest ── Core(..) | Behaviors(..)
//!
//! Response ─┬─ RequestResponse ─┬─ request_id
//!           │                   └─ ResponseBody ── Meta | Core | Behaviors
//!           └─ Notification ───── Core(..)
//! ```

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::studio::lock::LockState;

/// Maximum behaviors reported by `list_all_behaviors`.
pub const MAX_BEHAVIORS: usize = 64;
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_VALUE_NAME_LEN: usize = 16;
pub const MAX_PARAM_SETS: usize = 4;
pub const MAX_VALUES_PER_PARAM: usize = 8;

// ── Dispatch keys ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubsystemId {
    Core,
    Behaviors,
}

/// Request discriminant within a subsystem.
pub type RequestKind = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerKey {
    pub subsystem: SubsystemId,
    pub kind: RequestKind,
}

impl HandlerKey {
    pub const fn new(subsystem: SubsystemId, kind: RequestKind) -> Self {
        Self { subsystem, kind }
    }
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: u32,
    pub subsystem: SubsystemRequest,
}

impl Request {
    pub fn key(&self) -> HandlerKey {
        match &self.subsystem {
            SubsystemRequest::Core(r) => HandlerKey::new(SubsystemId::Core, r.kind()),
            SubsystemRequest::Behaviors(r) => HandlerKey::new(SubsystemId::Behaviors, r.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemRequest {
    Core(CoreRequest),
    Behaviors(BehaviorsRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreRequest {
    GetLockState,
    RequestUnlock,
    Lock,
}

impl CoreRequest {
    pub const GET_LOCK_STATE: RequestKind = 0;
    pub const REQUEST_UNLOCK: RequestKind = 1;
    pub const LOCK: RequestKind = 2;

    pub fn kind(self) -> RequestKind {
        match self {
            Self::GetLockState => Self::GET_LOCK_STATE,
            Self::RequestUnlock => Self::REQUEST_UNLOCK,
            Self::Lock => Self::LOCK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorsRequest {
    ListAllBehaviors,
    GetBehaviorDetails { behavior_id: u32 },
}

impl BehaviorsRequest {
    pub const LIST_ALL_BEHAVIORS: RequestKind = 0;
    pub const GET_BEHAVIOR_DETAILS: RequestKind = 1;

    pub fn kind(self) -> RequestKind {
        match self {
            Self::ListAllBehaviors => Self::LIST_ALL_BEHAVIORS,
            Self::GetBehaviorDetails { .. } => Self::GET_BEHAVIOR_DETAILS,
        }
    }
}

// ── Responses ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    RequestResponse(RequestResponse),
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResponse {
    pub request_id: u32,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseBody {
    Meta(MetaResponse),
    Core(CoreResponse),
    Behaviors(BehaviorsResponse),
}

impl ResponseBody {
    pub const fn no_response() -> Self {
        Self::Meta(MetaResponse::NoResponse)
    }

    pub const fn error(condition: ErrorCondition) -> Self {
        Self::Meta(MetaResponse::SimpleError(condition))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaResponse {
    NoResponse,
    SimpleError(ErrorCondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCondition {
    Generic,
    UnlockRequired,
    RpcNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreResponse {
    GetLockState(LockState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorsResponse {
    ListAllBehaviors(Vec<u32, MAX_BEHAVIORS>),
    GetBehaviorDetails(BehaviorDetails),
}

// ── Behavior metadata ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorDetails {
    pub id: u32,
    pub friendly_name: String<MAX_NAME_LEN>,
    /// `None` when the behavior takes no parameters.
    pub parameters: Option<BehaviorParameters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorParameters {
    Standard {
        param1: StandardDomain,
        param2: StandardDomain,
    },
    Custom(Vec<CustomParameterSet, MAX_PARAM_SETS>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomParameterSet {
    pub param1: Vec<ValueDescription, MAX_VALUES_PER_PARAM>,
    pub param2: Vec<ValueDescription, MAX_VALUES_PER_PARAM>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDescription {
    pub name: Option<String<MAX_VALUE_NAME_LEN>>,
    pub value: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Constant(u32),
    Range { min: u16, max: u16 },
    Standard(StandardDomain),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StandardDomain {
    #[default]
    Null,
    HidUsage,
    LayerIndex,
    Hsv,
}

// ── Notifications ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Core(CoreNotification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreNotification {
    LockStateChanged(LockState),
}

// ── Decoding ─────────────────────────────────────────────────

/// Decode a complete frame payload into a request.
pub fn decode_request(payload: &[u8]) -> Result<Request, CodecError> {
    postcard::from_bytes(payload).map_err(|_| CodecError::DecodeFailed)
}
