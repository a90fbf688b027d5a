//! Configuration for the Vessel server and agents.
//!
//! Read from `--config <path>` or `~/.vessel/config.toml`. Every section and
//! every key is optional; [`VesselConfig::resolve`] fills the gaps with
//! defaults and validates the result.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use vessel_agents::{AgentConfig, RetryConfig, Role};
use vessel_core::DEFAULT_TICK_PERIOD;
use vessel_rpc::DEFAULT_REQUEST_TIMEOUT;
use vessel_types::{Limits, LimitsError};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5001";

/// Overrides `server.address` when set.
pub const ADDRESS_ENV: &str = "VESSEL_ADDR";

#[derive(Debug, Default, Deserialize)]
pub struct VesselConfig {
    pub server: Option<ServerConfig>,
    pub container: Option<ContainerConfig>,
    pub producer: Option<AgentSection>,
    pub consumer: Option<AgentSection>,
    pub retry: Option<RetrySection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// `host:port`. `${VAR}` references are expanded from the environment.
    pub address: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContainerConfig {
    pub tick_period_ms: Option<u64>,
    pub pressure_limit: Option<f64>,
    pub upper_pressure_limit: Option<f64>,
    pub explosion_limit: Option<f64>,
    pub implosion_limit: Option<f64>,
}

/// `[producer]` or `[consumer]`.
#[derive(Debug, Default, Deserialize)]
pub struct AgentSection {
    pub poll_interval_ms: Option<u64>,
    pub threshold: Option<f64>,
    pub min_quantity: Option<u32>,
    pub max_quantity: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrySection {
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter_factor: Option<f64>,
    pub max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Limits(#[from] LimitsError),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } | ConfigError::Limits(_) => None,
        }
    }
}

/// Fully resolved, validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub address: String,
    pub request_timeout: Duration,
    pub tick_period: Duration,
    pub limits: Limits,
    pub producer: AgentConfig,
    pub consumer: AgentConfig,
    pub retry: RetryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tick_period: DEFAULT_TICK_PERIOD,
            limits: Limits::DEFAULT,
            producer: AgentConfig::new(Role::Producer),
            consumer: AgentConfig::new(Role::Consumer),
            retry: RetryConfig::default(),
        }
    }
}

impl Settings {
    /// Config for the agent playing `role`.
    #[must_use]
    pub fn agent(&self, role: Role) -> &AgentConfig {
        match role {
            Role::Producer => &self.producer,
            Role::Consumer => &self.consumer,
        }
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

impl VesselConfig {
    /// Load from `explicit`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields an empty
    /// config.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Resolve against defaults, honoring the `VESSEL_ADDR` override.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        self.resolve_with(env::var(ADDRESS_ENV).ok().filter(|a| !a.trim().is_empty()))
    }

    /// Resolve against defaults with an explicit address override.
    pub fn resolve_with(&self, address_override: Option<String>) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();

        if let Some(server) = &self.server {
            if let Some(address) = &server.address {
                settings.address = expand_env_vars(address);
            }
            if let Some(ms) = server.request_timeout_ms {
                settings.request_timeout = positive_millis("server.request_timeout_ms", ms)?;
            }
        }
        if let Some(address) = address_override {
            settings.address = address;
        }
        if settings.address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.address",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(container) = &self.container {
            if let Some(ms) = container.tick_period_ms {
                settings.tick_period = positive_millis("container.tick_period_ms", ms)?;
            }
            let defaults = Limits::DEFAULT;
            settings.limits = Limits::new(
                container.implosion_limit.unwrap_or(defaults.implosion()),
                container.pressure_limit.unwrap_or(defaults.pressure()),
                container
                    .upper_pressure_limit
                    .unwrap_or(defaults.upper_pressure()),
                container.explosion_limit.unwrap_or(defaults.explosion()),
            )?;
        }

        if let Some(section) = &self.producer {
            apply_agent(
                "producer",
                "producer.poll_interval_ms",
                section,
                &mut settings.producer,
            )?;
        }
        if let Some(section) = &self.consumer {
            apply_agent(
                "consumer",
                "consumer.poll_interval_ms",
                section,
                &mut settings.consumer,
            )?;
        }
        if let Some(section) = &self.retry {
            apply_retry(section, &mut settings.retry)?;
        }

        Ok(settings)
    }
}

fn positive_millis(field: &'static str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn apply_agent(
    name: &str,
    poll_field: &'static str,
    section: &AgentSection,
    agent: &mut AgentConfig,
) -> Result<(), ConfigError> {
    if let Some(ms) = section.poll_interval_ms {
        agent.poll_interval = positive_millis(poll_field, ms)?;
    }
    if let Some(threshold) = section.threshold {
        if !threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "threshold",
                reason: format!("{name} threshold must be finite, got {threshold}"),
            });
        }
        agent.threshold = threshold;
    }
    if let Some(min) = section.min_quantity {
        agent.min_quantity = min;
    }
    if let Some(max) = section.max_quantity {
        agent.max_quantity = max;
    }
    if agent.min_quantity > agent.max_quantity {
        return Err(ConfigError::Invalid {
            field: "min_quantity",
            reason: format!(
                "{name} min_quantity ({}) exceeds max_quantity ({})",
                agent.min_quantity, agent.max_quantity
            ),
        });
    }
    Ok(())
}

fn apply_retry(section: &RetrySection, retry: &mut RetryConfig) -> Result<(), ConfigError> {
    if let Some(ms) = section.initial_delay_ms {
        retry.initial_delay = positive_millis("retry.initial_delay_ms", ms)?;
    }
    if let Some(ms) = section.max_delay_ms {
        retry.max_delay = positive_millis("retry.max_delay_ms", ms)?;
    }
    if retry.max_delay < retry.initial_delay {
        return Err(ConfigError::Invalid {
            field: "retry.max_delay_ms",
            reason: "must not be below retry.initial_delay_ms".to_string(),
        });
    }
    if let Some(jitter) = section.jitter_factor {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::Invalid {
                field: "retry.jitter_factor",
                reason: format!("must be within [0, 1], got {jitter}"),
            });
        }
        retry.jitter_factor = jitter;
    }
    if let Some(max) = section.max_consecutive_failures {
        retry.max_consecutive_failures = (max > 0).then_some(max);
    }
    Ok(())
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vessel").join("config.toml"))
}
