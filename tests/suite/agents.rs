//! Producer and consumer agents driving a live server.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use vessel_agents::{Agent, AgentConfig, AgentExit, RetryConfig, Role};
use vessel_core::{ContainerService, GasContainer, GasState, Limits};
use vessel_rpc::{RemoteContainer, RpcServer};

use crate::common::{Fixture, TIMEOUT, closed_addr, wait_until};

fn fast(role: Role) -> AgentConfig {
    AgentConfig {
        poll_interval: Duration::from_millis(10),
        ..AgentConfig::new(role)
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        ..RetryConfig::default()
    }
}

#[tokio::test]
async fn producer_fills_until_pressure_limit_then_stops_on_destruction() {
    let fixture = Fixture::start(GasState::at(1.0, 293.0, Limits::DEFAULT)).await;
    let remote = RemoteContainer::new(fixture.addr.clone(), TIMEOUT);
    let agent = Agent::new(remote, fast(Role::Producer), fast_retry());
    let run = tokio::spawn(agent.run(future::pending()));

    // The container accepts mass until pressure reaches the limit.
    let container = &fixture.container;
    assert!(wait_until(Duration::from_secs(5), || container.pressure() >= 110.0).await);
    let filled = container.snapshot().mass;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(container.snapshot().mass, filled);

    container.tick(&mut || 10_000.0);
    let exit = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, AgentExit::ContainerDestroyed);

    fixture.stop().await;
}

#[tokio::test]
async fn consumer_drains_down_to_upper_limit_until_shutdown() {
    // 12 units at 293 K is ~157, over the consumer threshold.
    let fixture = Fixture::start(GasState::at(12.0, 293.0, Limits::DEFAULT)).await;
    let remote = RemoteContainer::new(fixture.addr.clone(), TIMEOUT);
    let agent = Agent::new(remote, fast(Role::Consumer), fast_retry());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(agent.run(async move {
        let _ = stop_rx.await;
    }));

    let container = &fixture.container;
    assert!(wait_until(Duration::from_secs(5), || container.pressure() <= 150.0).await);
    assert!(container.snapshot().mass < 12.0);
    assert!(!container.is_destroyed());

    stop_tx.send(()).unwrap();
    assert_eq!(run.await.unwrap(), AgentExit::Shutdown);

    fixture.stop().await;
}

#[tokio::test]
async fn agent_gives_up_when_nothing_is_listening() {
    let addr = closed_addr().await;
    let remote = RemoteContainer::new(addr, Duration::from_millis(200));
    let retry = RetryConfig {
        max_consecutive_failures: Some(3),
        ..fast_retry()
    };
    let agent = Agent::new(remote, fast(Role::Producer), retry);

    let exit = tokio::time::timeout(Duration::from_secs(5), agent.run(future::pending()))
        .await
        .unwrap();
    let AgentExit::GaveUp { failures, last_error } = exit else {
        panic!("expected GaveUp, got {exit:?}");
    };
    assert_eq!(failures, 3);
    assert!(last_error.contains("connecting to"), "{last_error}");
}

#[tokio::test]
async fn agent_recovers_once_the_server_comes_up() {
    let addr = closed_addr().await;
    let remote = RemoteContainer::new(addr.clone(), Duration::from_millis(200));
    let agent = Agent::new(remote, fast(Role::Producer), fast_retry());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(agent.run(async move {
        let _ = stop_rx.await;
    }));

    // Let a few connection attempts fail first.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let container = Arc::new(GasContainer::from_state(GasState::at(
        1.0,
        293.0,
        Limits::DEFAULT,
    )));
    let service = Arc::new(ContainerService::new(Arc::clone(&container)));
    let server = RpcServer::bind(addr.as_str(), service)
        .await
        .unwrap()
        .spawn();

    assert!(wait_until(Duration::from_secs(5), || container.snapshot().mass > 1.0).await);

    stop_tx.send(()).unwrap();
    assert_eq!(run.await.unwrap(), AgentExit::Shutdown);
    server.shutdown().await.unwrap();
}
