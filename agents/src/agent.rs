//! The producer/consumer polling loop.

use std::future::Future;
use std::time::Duration;

use crate::port::ContainerPort;
use crate::retry::{RetryConfig, calculate_retry_delay};

/// Which way an agent pushes the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Adds mass while pressure is below the threshold.
    Producer,
    /// Removes mass while pressure is above the threshold.
    Consumer,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }

    fn wants_adjustment(self, pressure: f64, threshold: f64) -> bool {
        match self {
            Self::Producer => pressure < threshold,
            Self::Consumer => pressure > threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub role: Role,
    pub poll_interval: Duration,
    pub threshold: f64,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

impl AgentConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
    pub const DEFAULT_THRESHOLD: f64 = 150.0;

    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            threshold: Self::DEFAULT_THRESHOLD,
            min_quantity: 1,
            max_quantity: 4,
        }
    }

    fn draw_quantity(&self) -> u32 {
        let low = self.min_quantity.min(self.max_quantity);
        let high = self.min_quantity.max(self.max_quantity);
        rand::random_range(low..=high)
    }
}

/// Result of one polling round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// The container reported destroyed; the agent is done.
    Destroyed,
    /// Pressure was on the agent's side of the threshold and mass was sent.
    Adjusted { quantity: u32, pressure: f64 },
    /// Pressure was on the other side of the threshold.
    Skipped { pressure: f64 },
}

/// Why [`Agent::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentExit {
    ContainerDestroyed,
    Shutdown,
    GaveUp { failures: u32, last_error: String },
}

pub struct Agent<C> {
    port: C,
    config: AgentConfig,
    retry: RetryConfig,
}

impl<C: ContainerPort> Agent<C> {
    #[must_use]
    pub fn new(port: C, config: AgentConfig, retry: RetryConfig) -> Self {
        Self {
            port,
            config,
            retry,
        }
    }

    /// One round: check for destruction, read pressure, maybe send mass.
    pub async fn step(&mut self) -> Result<Step, C::Error> {
        if self.port.is_destroyed().await? {
            tracing::info!("The container has been destroyed. Stopping updates.");
            return Ok(Step::Destroyed);
        }

        let pressure = self.port.pressure().await?;
        tracing::info!("Current pressure: {pressure}");

        let role = self.config.role;
        if !role.wants_adjustment(pressure, self.config.threshold) {
            match role {
                Role::Producer => {
                    tracing::info!("Pressure is above the threshold, no mass added.");
                }
                Role::Consumer => {
                    tracing::info!("Pressure is below the threshold, no mass removed.");
                }
            }
            return Ok(Step::Skipped { pressure });
        }

        let quantity = self.config.draw_quantity();
        match role {
            Role::Producer => {
                self.port.increase_mass(f64::from(quantity)).await?;
                tracing::info!("Added {quantity} units of mass.");
            }
            Role::Consumer => {
                self.port.decrease_mass(f64::from(quantity)).await?;
                tracing::info!("Removed {quantity} units of mass.");
            }
        }
        Ok(Step::Adjusted { quantity, pressure })
    }

    /// Poll until the container is destroyed, `shutdown` resolves, or the
    /// failure budget runs out.
    ///
    /// A successful round waits `poll_interval`; a failed one waits a backoff
    /// delay that grows with each consecutive failure.
    pub async fn run<F>(mut self, shutdown: F) -> AgentExit
    where
        F: Future<Output = ()>,
    {
        let role = self.config.role.as_str();
        tracing::info!(role, "Starting agent");
        tokio::pin!(shutdown);
        let mut failures: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => return AgentExit::Shutdown,
                outcome = self.step() => outcome,
            };

            let delay = match outcome {
                Ok(Step::Destroyed) => return AgentExit::ContainerDestroyed,
                Ok(_) => {
                    failures = 0;
                    self.config.poll_interval
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(role, failures, "Unable to reach container service: {e}");
                    if self.retry.exhausted(failures) {
                        return AgentExit::GaveUp {
                            failures,
                            last_error: e.to_string(),
                        };
                    }
                    calculate_retry_delay(failures - 1, &self.retry)
                }
            };

            tokio::select! {
                biased;
                () = &mut shutdown => return AgentExit::Shutdown,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
