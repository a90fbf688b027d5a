//! Shared test utilities and fixtures
//!
//! Every fixture binds to `127.0.0.1:0` so tests can run in parallel.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vessel_core::{ContainerService, GasContainer, GasState};
use vessel_rpc::{RpcServer, ServerHandle};

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// A container served over RPC, with direct access to the container for
/// assertions and manual ticks.
pub struct Fixture {
    pub server: ServerHandle,
    pub container: Arc<GasContainer>,
    pub addr: String,
}

impl Fixture {
    pub async fn start(state: GasState) -> Self {
        let container = Arc::new(GasContainer::from_state(state));
        let service = Arc::new(ContainerService::new(Arc::clone(&container)));
        let server = RpcServer::bind("127.0.0.1:0", service)
            .await
            .expect("bind test server")
            .spawn();
        let addr = server
            .local_addr()
            .expect("test server has an address")
            .to_string();
        Self {
            server,
            container,
            addr,
        }
    }

    pub async fn seeded() -> Self {
        Self::start(GasState::default()).await
    }

    pub async fn stop(self) {
        self.server.shutdown().await.expect("server shuts down cleanly");
    }
}

/// An address nothing is listening on.
pub async fn closed_addr() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("listener address").to_string();
    drop(listener);
    addr
}

/// Poll `condition` every 10ms until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
