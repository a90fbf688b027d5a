//! Container behavior observed through the RPC transport.

use vessel_core::{GasState, Limits, TickOutcome};
use vessel_rpc::{RemoteContainer, RpcClient};

use crate::common::{Fixture, TIMEOUT};

const SEED_PRESSURE: f64 = 10.0 * 293.0 / 22.4;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn seeded_container_reports_seed_pressure() {
    let fixture = Fixture::seeded().await;
    let mut client = RpcClient::connect(&fixture.addr, TIMEOUT).await.unwrap();

    let pressure = client.get_pressure().await.unwrap();
    assert!(close(pressure, SEED_PRESSURE), "pressure {pressure}");
    assert!(!client.is_destroyed().await.unwrap());

    fixture.stop().await;
}

#[tokio::test]
async fn increase_is_ignored_at_or_above_pressure_limit() {
    let fixture = Fixture::seeded().await;
    let mut client = RpcClient::connect(&fixture.addr, TIMEOUT).await.unwrap();

    client.increase_mass(3.0).await.unwrap();
    assert_eq!(fixture.container.snapshot().mass, 10.0);
    assert!(close(client.get_pressure().await.unwrap(), SEED_PRESSURE));

    fixture.stop().await;
}

#[tokio::test]
async fn decrease_applies_above_upper_limit() {
    let fixture = Fixture::seeded().await;
    let mut client = RpcClient::connect(&fixture.addr, TIMEOUT).await.unwrap();

    client.decrease_mass(1.0).await.unwrap();
    assert_eq!(fixture.container.snapshot().mass, 9.0);

    // 9 units at 293 K is below the upper limit, so the next one is refused.
    client.decrease_mass(1.0).await.unwrap();
    assert_eq!(fixture.container.snapshot().mass, 9.0);

    fixture.stop().await;
}

#[tokio::test]
async fn explosion_then_reset_is_visible_remotely() {
    let fixture = Fixture::start(GasState::at(12.0, 293.0, Limits::DEFAULT)).await;
    let mut client = RpcClient::connect(&fixture.addr, TIMEOUT).await.unwrap();

    // Overpressure alone does not destroy; the next tick does.
    assert!(!client.is_destroyed().await.unwrap());
    let outcome = fixture.container.tick(&mut || 0.0);
    assert!(matches!(outcome, TickOutcome::Breached { .. }));
    assert!(client.is_destroyed().await.unwrap());

    // Frozen while destroyed.
    client.decrease_mass(2.0).await.unwrap();
    assert_eq!(fixture.container.snapshot().mass, 12.0);

    assert_eq!(fixture.container.tick(&mut || 0.0), TickOutcome::Reset);
    assert!(!client.is_destroyed().await.unwrap());
    assert!(close(client.get_pressure().await.unwrap(), SEED_PRESSURE));

    fixture.stop().await;
}

#[tokio::test]
async fn implosion_destroys_container() {
    let fixture = Fixture::start(GasState::at(2.0, 293.0, Limits::DEFAULT)).await;
    let mut remote = RemoteContainer::new(fixture.addr.clone(), TIMEOUT);

    fixture.container.tick(&mut || -5.0);
    assert!(remote.is_destroyed().await.unwrap());

    remote.increase_mass(1.0).await.unwrap();
    assert_eq!(fixture.container.snapshot().mass, 2.0);

    fixture.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_lose_no_updates() {
    // At 1 K the pressure stays far below the limit for the whole run.
    let fixture = Fixture::start(GasState::at(0.0, 1.0, Limits::DEFAULT)).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let addr = fixture.addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut client = RpcClient::connect(&addr, TIMEOUT).await.unwrap();
            for _ in 0..25 {
                client.increase_mass(1.0).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(fixture.container.snapshot().mass, 200.0);
    fixture.stop().await;
}
