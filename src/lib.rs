//! Studio RPC core library.
//!
//! Framing, transport plumbing, dispatch and lock enforcement for a
//! configurable peripheral's studio management interface. Physical drivers
//! plug in through the adapter traits; everything else is pure logic and
//! runs unchanged on the host for testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod events;
pub mod rpc;
pub mod studio;

mod error;

pub use error::{CodecError, Error, RegistryError, Result, TransportError};
