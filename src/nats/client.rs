/// NATS client for subject subscriptions
///
/// Provides connection management and plain or queue-group subscriptions

use std::time::Duration;

use crate::error::ForwardError;

#[derive(Clone, Debug)]
pub struct NatsConfig {
    /// Server URL, or a comma-separated list of servers
    pub url: String,
    /// Subject to subscribe, wildcards allowed
    pub subject: String,
    /// Queue group for load-shared consumption
    pub queue: Option<String>,
    pub connect_timeout: Duration,
}

impl NatsConfig {
    /// Build the config from a variable lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        Self {
            url: var("MY_NATSBOOTSTRAP").unwrap_or_else(|| "nats://localhost:4222".to_string()),
            subject: var("MY_TOPIC").unwrap_or_default(),
            queue: var("MY_QUEUE"),
            connect_timeout: Duration::from_secs(
                var("MY_NATS_CONNECT_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
    config: NatsConfig,
}

impl NatsClient {
    /// Connect to NATS
    pub async fn connect(config: NatsConfig) -> Result<Self, ForwardError> {
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(config.connect_timeout)
            .connect(config.url.as_str())
            .await
            .map_err(|e| ForwardError::Nats(format!("failed to connect to {}: {}", config.url, e)))?;

        let info = client.server_info();
        tracing::info!(
            target_url = %config.url,
            server_id = %info.server_id,
            server_name = %info.server_name,
            discovered_servers = ?info.connect_urls,
            "Connected to NATS"
        );

        Ok(Self { client, config })
    }

    /// Subscribe to the configured subject.
    ///
    /// Uses a queue subscription when a queue group is configured, so the
    /// server delivers each message to one member of the group.
    pub async fn subscribe(&self) -> Result<async_nats::Subscriber, ForwardError> {
        let subject = self.config.subject.clone();

        let subscriber = match &self.config.queue {
            Some(queue) => self
                .client
                .queue_subscribe(subject.clone(), queue.clone())
                .await
                .map_err(|e| ForwardError::Nats(format!("queue subscribe to '{}' failed: {}", subject, e)))?,
            None => self
                .client
                .subscribe(subject.clone())
                .await
                .map_err(|e| ForwardError::Nats(format!("subscribe to '{}' failed: {}", subject, e)))?,
        };

        // Make sure the server has registered interest before we report ready
        self.client
            .flush()
            .await
            .map_err(|e| ForwardError::Nats(format!("flush failed: {}", e)))?;

        tracing::info!(
            subject = %subject,
            queue = self.config.queue.as_deref().unwrap_or(""),
            "Listening on subject"
        );

        Ok(subscriber)
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Check if the NATS connection is active
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }

    /// Flush pending writes before the client is dropped
    pub async fn close(self) {
        if let Err(e) = self.client.flush().await {
            tracing::warn!(error = %e, "Failed to flush NATS connection on close");
        }
        tracing::info!("Closing NATS connection");
    }
}
