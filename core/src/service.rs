//! Service facade consumed by the transport layer.

use std::sync::Arc;

use crate::container::GasContainer;

/// The four container operations, as seen from outside the process.
///
/// Synchronous by contract: every call completes against the container's
/// lock in bounded time, so transports may call it straight from an async
/// task.
pub trait GasContainerService: Send + Sync {
    fn increase_mass(&self, mass: f64);
    fn decrease_mass(&self, mass: f64);
    fn get_pressure(&self) -> f64;
    fn is_destroyed(&self) -> bool;
}

/// Pass-through facade over a shared [`GasContainer`].
#[derive(Debug, Clone)]
pub struct ContainerService {
    container: Arc<GasContainer>,
}

impl ContainerService {
    #[must_use]
    pub fn new(container: Arc<GasContainer>) -> Self {
        Self { container }
    }
}

impl GasContainerService for ContainerService {
    fn increase_mass(&self, mass: f64) {
        self.container.increase_mass(mass);
    }

    fn decrease_mass(&self, mass: f64) {
        self.container.decrease_mass(mass);
    }

    fn get_pressure(&self) -> f64 {
        self.container.pressure()
    }

    fn is_destroyed(&self) -> bool {
        self.container.is_destroyed()
    }
}
