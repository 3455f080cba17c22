//! Unified error types for the studio RPC core.
//!
//! A single `Error` enum that every subsystem converts into. Variants are
//! `Copy` so they can be logged and passed around the worker without
//! allocation. Protocol-level failures seen by the client (not found,
//! unlock required) are NOT errors here: they travel as ordinary response
//! messages, see [`crate::rpc::proto::ErrorCondition`].

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A message could not be encoded or decoded.
    Codec(CodecError),
    /// A transport failed to start, stop or send.
    Transport(TransportError),
    /// Static registration of subsystems, handlers, transports or mappers failed.
    Registry(RegistryError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Frame bytes did not decode into a valid message.
    DecodeFailed,
    /// The message could not be serialised.
    EncodeFailed,
    /// The outbound ring stayed full past the timeout.
    TxSaturated,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeFailed => write!(f, "message decode failed"),
            Self::EncodeFailed => write!(f, "message encode failed"),
            Self::TxSaturated => write!(f, "transmit buffer saturated"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No transport of the requested kind is registered.
    NotRegistered,
    /// The driver rejected the operation.
    Io,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "transport not registered"),
            Self::Io => write!(f, "driver I/O error"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Startup registration mistakes. These are programmer errors and are
/// surfaced when the service is assembled, never at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateSubsystem,
    UnknownSubsystem,
    DuplicateHandler,
    DuplicateTransport,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSubsystem => write!(f, "subsystem registered twice"),
            Self::UnknownSubsystem => write!(f, "handler registered for unknown subsystem"),
            Self::DuplicateHandler => write!(f, "handler registered twice"),
            Self::DuplicateTransport => write!(f, "transport kind registered twice"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
