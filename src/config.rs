//! Process configuration.
//!
//! Values come from the environment (optionally seeded from a `.env` file);
//! the binary layers its command-line flags on top before validating.

use crate::error::ForwardError;
use crate::forwarder::runner::DEFAULT_MAX_IN_FLIGHT;
use crate::nats::NatsConfig;

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub nats: NatsConfig,
    /// Base URL of the indexing store
    pub endpoint: String,
    /// Document type appended to every index path
    pub doc_type: String,
    /// Include timestamps in log lines
    pub show_time: bool,
    /// Cap on deliveries running at once
    pub max_in_flight: usize,
}

impl BridgeConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            nats: NatsConfig::from_lookup(&lookup),
            endpoint: lookup("MY_ELASTICSEARCH_ENDPOINT").unwrap_or_default(),
            doc_type: lookup("MY_ELASTICSEARCH_TYPE").unwrap_or_default(),
            // Only the literal "false" turns timestamps off
            show_time: lookup("MY_TIMESTAMP").as_deref() != Some("false"),
            max_in_flight: lookup("MY_MAX_IN_FLIGHT")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(DEFAULT_MAX_IN_FLIGHT),
        }
    }

    /// Check that every required value is present
    pub fn validate(&self) -> Result<(), ForwardError> {
        if self.nats.subject.trim().is_empty() {
            return Err(ForwardError::Config(
                "no subject configured (MY_TOPIC or --subject)".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ForwardError::Config(
                "no endpoint configured (MY_ELASTICSEARCH_ENDPOINT or --endpoint)".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(ForwardError::Config(
                "max in-flight deliveries must be at least 1 (MY_MAX_IN_FLIGHT or --max-in-flight)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
