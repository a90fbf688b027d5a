//! The gas container logic unit.
//!
//! One mutex guards the whole [`GasState`]. Every operation, including pure
//! reads and the drift tick, holds it for the full critical section and
//! nothing else: log events are emitted after the guard is dropped, and the
//! drift task sleeps between ticks without it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use vessel_types::{Breach, GasState, Limits, TickOutcome};

use crate::drift::TemperatureSource;

/// Result of a mass adjustment, used only to decide what to log.
///
/// Callers of the public API never see this: a rejected adjustment is
/// indistinguishable from an accepted one except by reading pressure again.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Adjustment {
    Applied { delta: f64, mass: f64 },
    Destroyed,
    OutOfBand { pressure: f64 },
}

/// Thread-safe owner of the container state.
#[derive(Debug)]
pub struct GasContainer {
    state: Mutex<GasState>,
}

impl GasContainer {
    /// Container at the seed state with the given limits.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self::from_state(GasState::new(limits))
    }

    /// Container starting from an explicit state.
    #[must_use]
    pub fn from_state(state: GasState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    // Every critical section is plain arithmetic that leaves the record
    // valid, so a poisoned guard still holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, GasState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `delta` to the mass if the container is intact and pressure is
    /// strictly below the pressure limit. Otherwise does nothing.
    pub fn increase_mass(&self, delta: f64) {
        let adjustment = {
            let mut state = self.lock();
            let pressure = state.pressure();
            if state.destroyed {
                Adjustment::Destroyed
            } else if state.limits.permits_increase(pressure) {
                state.mass += delta;
                Adjustment::Applied {
                    delta,
                    mass: state.mass,
                }
            } else {
                Adjustment::OutOfBand { pressure }
            }
        };

        match adjustment {
            Adjustment::Applied { delta, mass } => {
                tracing::info!("Mass increased by {delta} units. New mass: {mass} units.");
            }
            Adjustment::Destroyed => {
                tracing::info!("Container destroyed, mass increase ignored.");
            }
            Adjustment::OutOfBand { pressure } => {
                tracing::info!(pressure, "Pressure too high to add mass.");
            }
        }
    }

    /// Subtract `delta` from the mass if the container is intact and pressure
    /// is strictly above the upper pressure limit. Otherwise does nothing.
    pub fn decrease_mass(&self, delta: f64) {
        let adjustment = {
            let mut state = self.lock();
            let pressure = state.pressure();
            if state.destroyed {
                Adjustment::Destroyed
            } else if state.limits.permits_decrease(pressure) {
                state.mass -= delta;
                Adjustment::Applied {
                    delta,
                    mass: state.mass,
                }
            } else {
                Adjustment::OutOfBand { pressure }
            }
        };

        match adjustment {
            Adjustment::Applied { delta, mass } => {
                tracing::info!("Mass decreased by {delta} units. New mass: {mass} units.");
            }
            Adjustment::Destroyed => {
                tracing::info!("Container destroyed, mass decrease ignored.");
            }
            Adjustment::OutOfBand { pressure } => {
                tracing::info!(pressure, "Pressure too low to remove mass.");
            }
        }
    }

    #[must_use]
    pub fn pressure(&self) -> f64 {
        self.lock().pressure()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    /// Copy of the full state taken under a single lock acquisition.
    #[must_use]
    pub fn snapshot(&self) -> GasState {
        *self.lock()
    }

    /// Run one drift cycle.
    ///
    /// An intact container has its temperature perturbed by one draw from
    /// `source` and is then checked against the destructive limits. A
    /// container destroyed by a previous tick is reset instead, so recovery
    /// always lags destruction by exactly one tick.
    pub fn tick(&self, source: &mut impl TemperatureSource) -> TickOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.destroyed {
                state.reset();
                TickOutcome::Reset
            } else {
                let delta = source.next_delta();
                state.temperature += delta;
                let pressure = state.pressure();
                match state.limits.breach(pressure) {
                    Some(breach) => {
                        state.destroyed = true;
                        TickOutcome::Breached {
                            breach,
                            delta,
                            temperature: state.temperature,
                            pressure,
                        }
                    }
                    None => TickOutcome::Drifted {
                        delta,
                        temperature: state.temperature,
                        pressure,
                    },
                }
            }
        };

        log_tick(&outcome);
        outcome
    }
}

impl Default for GasContainer {
    fn default() -> Self {
        Self::new(Limits::DEFAULT)
    }
}

fn log_tick(outcome: &TickOutcome) {
    match *outcome {
        TickOutcome::Drifted {
            delta,
            temperature,
            pressure,
        } => {
            tracing::info!("Temperature changed by {delta}K. New temperature: {temperature}K");
            tracing::info!("Current pressure: {pressure}");
        }
        TickOutcome::Breached {
            breach,
            delta,
            temperature,
            pressure,
        } => {
            tracing::info!("Temperature changed by {delta}K. New temperature: {temperature}K");
            tracing::info!("Current pressure: {pressure}");
            match breach {
                Breach::Implosion => tracing::warn!(
                    pressure,
                    "Pressure dropped below implosion limit. Container imploded!"
                ),
                Breach::Explosion => tracing::warn!(
                    pressure,
                    "Pressure exceeded explosion limit. Container exploded!"
                ),
            }
        }
        TickOutcome::Reset => {
            tracing::info!("Container destroyed. Resetting state.");
        }
    }
}
