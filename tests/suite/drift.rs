//! Autonomous drift running behind a live server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use vessel_core::{GasState, Limits, RandomSwing, ThermalDrift, TickOutcome};
use vessel_rpc::RpcClient;

use crate::common::{Fixture, TIMEOUT};

#[tokio::test]
async fn drift_destroys_and_resets_on_consecutive_ticks() {
    // Just under the explosion limit; one +20 K step pushes it over, then
    // the temperature holds still.
    let fixture = Fixture::start(GasState::at(10.5, 293.0, Limits::DEFAULT)).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut draws = 0;
    let source = move || {
        draws += 1;
        if draws == 1 { 20.0 } else { 0.0 }
    };
    let drift = ThermalDrift::spawn_with(
        Arc::clone(&fixture.container),
        Duration::from_millis(20),
        source,
        Some(tx),
    );

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, TickOutcome::Breached { .. }), "{first:?}");

    let second = rx.recv().await.unwrap();
    assert_eq!(second, TickOutcome::Reset);

    drift.shutdown().await;

    let mut client = RpcClient::connect(&fixture.addr, TIMEOUT).await.unwrap();
    assert!(!client.is_destroyed().await.unwrap());
    assert_eq!(fixture.container.snapshot(), GasState::default());

    fixture.stop().await;
}

#[tokio::test]
async fn drift_keeps_the_container_within_a_swing_per_tick() {
    let fixture = Fixture::seeded().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let drift = ThermalDrift::spawn_with(
        Arc::clone(&fixture.container),
        Duration::from_millis(5),
        RandomSwing::default(),
        Some(tx),
    );

    for _ in 0..5 {
        match rx.recv().await.unwrap() {
            TickOutcome::Drifted { delta, .. } | TickOutcome::Breached { delta, .. } => {
                assert!((-15.0..=15.0).contains(&delta));
                assert_eq!(delta.fract(), 0.0);
            }
            TickOutcome::Reset => {}
        }
    }

    drift.shutdown().await;
    fixture.stop().await;
}
