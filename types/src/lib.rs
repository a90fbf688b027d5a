//! Core domain types for Vessel.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the state record
//! itself, its pressure limits, and the vocabulary used to describe what a drift
//! tick did to it.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

use std::fmt;

use thiserror::Error;

// ============================================================================
// Physical Constants
// ============================================================================

/// Fixed container volume used by the pressure approximation `P = m * T / V`.
pub const VOLUME: f64 = 22.4;

/// Mass the container holds at process start and after every reset.
pub const SEED_MASS: f64 = 10.0;

/// Temperature (Kelvin) the container holds at process start and after every reset.
pub const SEED_TEMPERATURE: f64 = 293.0;

/// Largest temperature swing (Kelvin, either direction) a single drift tick applies.
pub const TEMPERATURE_SWING: u32 = 15;

/// Derived pressure for a mass/temperature pair.
#[must_use]
pub fn pressure_of(mass: f64, temperature: f64) -> f64 {
    (mass * temperature) / VOLUME
}

// ============================================================================
// Pressure Limits
// ============================================================================

/// Validated pressure thresholds.
///
/// `implosion < pressure < upper_pressure < explosion` is guaranteed by
/// construction. You cannot create a `Limits` whose bands overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    implosion: f64,
    pressure: f64,
    upper_pressure: f64,
    explosion: f64,
}

/// Error when trying to construct invalid limits.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LimitsError {
    #[error("limit `{name}` must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("limit `{lower}` ({lower_value}) must be below `{upper}` ({upper_value})")]
    OutOfOrder {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },
}

impl Limits {
    /// Defaults used when no configuration overrides them.
    pub const DEFAULT: Self = Self {
        implosion: 40.0,
        pressure: 110.0,
        upper_pressure: 125.0,
        explosion: 140.0,
    };

    pub fn new(
        implosion: f64,
        pressure: f64,
        upper_pressure: f64,
        explosion: f64,
    ) -> Result<Self, LimitsError> {
        let named = [
            ("implosion_limit", implosion),
            ("pressure_limit", pressure),
            ("upper_pressure_limit", upper_pressure),
            ("explosion_limit", explosion),
        ];

        for (name, value) in named {
            if !value.is_finite() {
                return Err(LimitsError::NotFinite { name, value });
            }
        }

        for pair in named.windows(2) {
            let (lower, lower_value) = pair[0];
            let (upper, upper_value) = pair[1];
            if lower_value >= upper_value {
                return Err(LimitsError::OutOfOrder {
                    lower,
                    lower_value,
                    upper,
                    upper_value,
                });
            }
        }

        Ok(Self {
            implosion,
            pressure,
            upper_pressure,
            explosion,
        })
    }

    /// Below this the container implodes.
    #[must_use]
    pub const fn implosion(&self) -> f64 {
        self.implosion
    }

    /// Producers may only add mass while pressure is strictly below this.
    #[must_use]
    pub const fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Consumers may only remove mass while pressure is strictly above this.
    #[must_use]
    pub const fn upper_pressure(&self) -> f64 {
        self.upper_pressure
    }

    /// Above this the container explodes.
    #[must_use]
    pub const fn explosion(&self) -> f64 {
        self.explosion
    }

    /// Classify a pressure reading against the destructive limits.
    ///
    /// Comparisons are strict: a reading exactly on a limit is still safe.
    #[must_use]
    pub fn breach(&self, pressure: f64) -> Option<Breach> {
        if pressure < self.implosion {
            Some(Breach::Implosion)
        } else if pressure > self.explosion {
            Some(Breach::Explosion)
        } else {
            None
        }
    }

    #[must_use]
    pub fn permits_increase(&self, pressure: f64) -> bool {
        pressure < self.pressure
    }

    #[must_use]
    pub fn permits_decrease(&self, pressure: f64) -> bool {
        pressure > self.upper_pressure
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// Container Phase
// ============================================================================

/// How a container left its safe band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    Implosion,
    Explosion,
}

impl Breach {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Implosion => "implosion",
            Self::Explosion => "explosion",
        }
    }
}

impl fmt::Display for Breach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two states of the container state machine.
///
/// There is no terminal phase: a destroyed container is reset on the next
/// drift tick and the cycle continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPhase {
    Stable,
    Destroyed,
}

impl ContainerPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for ContainerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Gas State Record
// ============================================================================

/// The physical state of the container.
///
/// Plain data with no locking of its own; whoever owns it is responsible for
/// serializing access. Pressure is never stored, it is recomputed from the
/// current mass and temperature on every read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasState {
    /// Arbitrary units.
    pub mass: f64,
    /// Kelvin.
    pub temperature: f64,
    pub destroyed: bool,
    pub limits: Limits,
}

impl GasState {
    /// Seed state with the given limits.
    #[must_use]
    pub const fn new(limits: Limits) -> Self {
        Self {
            mass: SEED_MASS,
            temperature: SEED_TEMPERATURE,
            destroyed: false,
            limits,
        }
    }

    /// A stable state at an arbitrary mass/temperature pair.
    #[must_use]
    pub const fn at(mass: f64, temperature: f64, limits: Limits) -> Self {
        Self {
            mass,
            temperature,
            destroyed: false,
            limits,
        }
    }

    #[must_use]
    pub fn pressure(&self) -> f64 {
        pressure_of(self.mass, self.temperature)
    }

    #[must_use]
    pub const fn phase(&self) -> ContainerPhase {
        if self.destroyed {
            ContainerPhase::Destroyed
        } else {
            ContainerPhase::Stable
        }
    }

    /// Hard reset to the seed values. Limits are left untouched.
    pub fn reset(&mut self) {
        self.mass = SEED_MASS;
        self.temperature = SEED_TEMPERATURE;
        self.destroyed = false;
    }
}

impl Default for GasState {
    fn default() -> Self {
        Self::new(Limits::DEFAULT)
    }
}

// ============================================================================
// Tick Outcome
// ============================================================================

/// What a single drift tick did to the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Temperature moved and the container stayed inside its safe band.
    Drifted {
        delta: f64,
        temperature: f64,
        pressure: f64,
    },
    /// Temperature moved and pressure left the safe band; the container is
    /// now destroyed and will be reset on the next tick.
    Breached {
        breach: Breach,
        delta: f64,
        temperature: f64,
        pressure: f64,
    },
    /// The container was destroyed on the previous tick and has been reset.
    Reset,
}
