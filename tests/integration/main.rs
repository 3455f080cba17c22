//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the RPC stack end to
//! end against mock transports and drivers. All tests run on the host
//! with no real hardware required.

mod lock_flow_tests;
mod mock_transport;
mod pipeline_tests;
mod worker_tests;
