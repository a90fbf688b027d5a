//! Core domain logic for Vessel.
//!
//! This crate owns the concurrent state machine around a single gas container:
//!
//! - [`GasContainer`]: the logic unit, one mutex around the whole state record
//! - [`ThermalDrift`]: the autonomous task that perturbs temperature, flags
//!   destruction, and resets the container one tick later
//! - [`GasContainerService`]: the synchronous facade the transport is wired to

mod container;
pub mod drift;
mod service;

pub use container::GasContainer;
pub use drift::{DEFAULT_TICK_PERIOD, RandomSwing, TemperatureSource, ThermalDrift};
pub use service::{ContainerService, GasContainerService};
pub use vessel_types::{Breach, ContainerPhase, GasState, Limits, TickOutcome};
