//! Autonomous temperature drift.
//!
//! [`ThermalDrift`] owns a tokio task that ticks a shared [`GasContainer`] on a
//! fixed period for as long as the handle lives. The first tick fires one full
//! period after spawn. The task holds the container lock only inside
//! [`GasContainer::tick`]; the wait between ticks happens without it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use vessel_types::{TEMPERATURE_SWING, TickOutcome};

use crate::container::GasContainer;

/// Default interval between drift ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(2);

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Supplies the temperature perturbation for each drift tick.
pub trait TemperatureSource {
    /// Next temperature change in Kelvin.
    fn next_delta(&mut self) -> f64;
}

impl<F: FnMut() -> f64> TemperatureSource for F {
    fn next_delta(&mut self) -> f64 {
        self()
    }
}

/// Uniform integer swing in `[-swing, +swing]` Kelvin.
#[derive(Debug, Clone, Copy)]
pub struct RandomSwing {
    swing: i32,
}

impl RandomSwing {
    /// Widths past `i32::MAX` are clamped to it.
    #[must_use]
    pub fn new(swing: u32) -> Self {
        Self {
            swing: i32::try_from(swing).unwrap_or(i32::MAX),
        }
    }
}

impl Default for RandomSwing {
    fn default() -> Self {
        Self::new(TEMPERATURE_SWING)
    }
}

impl TemperatureSource for RandomSwing {
    fn next_delta(&mut self) -> f64 {
        f64::from(rand::random_range(-self.swing..=self.swing))
    }
}

/// Handle to the running drift task.
///
/// Dropping the handle signals the task to stop without waiting for it;
/// [`ThermalDrift::shutdown`] stops it and waits.
pub struct ThermalDrift {
    stop: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ThermalDrift {
    /// Spawn the drift task with random perturbations.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(container: Arc<GasContainer>, period: Duration) -> Self {
        Self::spawn_with(container, period, RandomSwing::default(), None)
    }

    /// Spawn the drift task with an explicit perturbation source.
    ///
    /// Every tick outcome is forwarded to `observer` when one is given; a
    /// closed observer is ignored.
    #[must_use]
    pub fn spawn_with<S>(
        container: Arc<GasContainer>,
        period: Duration,
        source: S,
        observer: Option<mpsc::UnboundedSender<TickOutcome>>,
    ) -> Self
    where
        S: TemperatureSource + Send + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(drift_loop(container, period, source, observer, stop_rx));
        tracing::debug!(period_ms = period.as_millis() as u64, "Thermal drift started");

        Self {
            stop: Some(stop_tx),
            join: Some(join),
        }
    }

    /// Stop the task and wait (bounded) for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(join) = self.join.take()
            && tokio::time::timeout(SHUTDOWN_TIMEOUT, join).await.is_err()
        {
            tracing::warn!("Thermal drift did not stop in time");
        }
    }
}

impl Drop for ThermalDrift {
    fn drop(&mut self) {
        // Best-effort stop; do not block in Drop.
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn drift_loop<S: TemperatureSource>(
    container: Arc<GasContainer>,
    period: Duration,
    mut source: S,
    observer: Option<mpsc::UnboundedSender<TickOutcome>>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticks.tick() => {
                let outcome = container.tick(&mut source);
                if let Some(observer) = &observer {
                    let _ = observer.send(outcome);
                }
            }
        }
    }

    tracing::debug!("Thermal drift stopped");
}
