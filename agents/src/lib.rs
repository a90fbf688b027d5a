//! Driver agents for a remote gas container.
//!
//! A producer tops the container up while pressure is low; a consumer bleeds
//! it off while pressure is high. Both stop once the container reports it has
//! been destroyed.

mod agent;
mod port;
pub mod retry;

pub use agent::{Agent, AgentConfig, AgentExit, Role, Step};
pub use port::ContainerPort;
pub use retry::{RetryConfig, calculate_retry_delay};
