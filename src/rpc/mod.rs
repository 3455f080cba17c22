//! Transport-agnostic studio RPC stack.
//!
//! Byte-stuffed frames carrying postcard-encoded messages, shared by every
//! physical transport through a pair of SPSC rings.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      RPC Stack                             │
//! │                                                            │
//! │  ┌───────────┐   ┌─────────┐   ┌───────────┐   ┌─────────┐ │
//! │  │ Transport │──▶│ RX ring │──▶│  Framing  │──▶│Dispatch │ │
//! │  │ (trait)   │   └─────────┘   │ (decode)  │   │ + lock  │ │
//! │  └───────────┘                 └───────────┘   └────┬────┘ │
//! │       ▲                                             │      │
//! │       │        ┌─────────┐   ┌───────────┐          │      │
//! │       └────────│ TX ring │◀──│ Pipeline  │◀─────────┘      │
//! │                └─────────┘   │ (encode)  │◀── Mappers      │
//! │                              └───────────┘    (events)     │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod dispatch;
pub mod framing;
pub mod idle;
pub mod notify;
pub mod pipeline;
pub mod proto;
pub mod ring_buffer;
pub mod service;
pub mod transport;
pub mod worker;
