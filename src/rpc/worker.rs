//! RPC worker thread.
//!
//! Runs the [`RpcService`] on a dedicated thread using `edge-executor`
//! driven by `futures_lite::future::block_on`. The loop sleeps on the
//! channel wake signal, so it costs nothing while the link is quiet.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────┐
//!  │  studio-rpc thread                               │
//!  │  ┌────────────────────────────────────────────┐  │
//!  │  │  futures_lite::block_on                    │  │
//!  │  │  ┌──────────────────────────────────────┐  │  │
//!  │  │  │  edge_executor::LocalExecutor        │  │  │
//!  │  │  │   loop { poll → tick → wait(wake) }  │  │  │
//!  │  │  └──────────────────────────────────────┘  │  │
//!  │  └────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────┘
//! ```

use embassy_time::{Duration, Instant, with_timeout};
use log::info;

use super::service::RpcService;

/// Worker thread stack.
const WORKER_STACK_SIZE: usize = 16 * 1024;

/// Wake-up period while idle auto-lock is armed.
const IDLE_CHECK_PERIOD: Duration = Duration::from_millis(500);

/// Drive `service` until [`RpcChannels::shutdown`](super::channels::RpcChannels::shutdown)
/// is requested. Returns the service so its state can be inspected.
pub async fn run(mut service: RpcService) -> RpcService {
    let channels = service.channels().clone();
    let mut last_tick = Instant::now();

    info!(
        "RPC worker started (transport {:?})",
        service.active_transport()
    );

    loop {
        service.poll();

        let now = Instant::now();
        service.tick(now.duration_since(last_tick).as_millis());
        last_tick = now;

        if channels.is_shutdown() {
            break;
        }

        if service.idle_lock_enabled() {
            // Timeout only means "time to check the idle timer".
            let _ = with_timeout(IDLE_CHECK_PERIOD, channels.wait()).await;
        } else {
            channels.wait().await;
        }
    }

    info!("RPC worker stopped");
    service
}

/// Spawn the worker on its own thread.
pub fn spawn(service: RpcService) -> std::io::Result<std::thread::JoinHandle<RpcService>> {
    std::thread::Builder::new()
        .name("studio-rpc".into())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            let executor: edge_executor::LocalExecutor<'_, 1> = edge_executor::LocalExecutor::new();
            futures_lite::future::block_on(executor.run(run(service)))
        })
}
