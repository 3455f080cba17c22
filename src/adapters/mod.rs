//! Adapters — concrete studio RPC transports over driver ports.
//!
//! | Adapter          | Implements     | Driver port    | Callback handle |
//! |------------------|----------------|----------------|-----------------|
//! | `uart_transport` | RpcTransport   | `UartDriver`   | `UartLink`      |
//! | `gatt_transport` | RpcTransport   | `GattNotifier` | `GattLink`      |
//!
//! Each constructor returns the transport (registered with the service)
//! and a shared handle for the driver's interrupt or host-stack callbacks.

pub mod gatt_transport;
pub mod uart_transport;
