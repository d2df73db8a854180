//! nats-es-forwarder - subscribes to a NATS subject and indexes every message
//!
//! Configuration is read from the environment (and `.env`); flags override it.

use std::process;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;

use nats_es_forwarder::forwarder::{self, MessageHandler};
use nats_es_forwarder::{telemetry, BridgeConfig, EndpointClient, ForwardError, NatsClient, RawMessage};

#[derive(Parser)]
#[command(name = "nats-es-forwarder")]
#[command(version, about = "Forward NATS messages into dated Elasticsearch indices", long_about = None)]
struct Cli {
    /// NATS server URL(s), comma separated [env: MY_NATSBOOTSTRAP]
    #[arg(long)]
    nats_url: Option<String>,

    /// Subject to subscribe, wildcards allowed [env: MY_TOPIC]
    #[arg(short, long)]
    subject: Option<String>,

    /// Queue group for load-shared consumption [env: MY_QUEUE]
    #[arg(short, long)]
    queue: Option<String>,

    /// Base URL of the indexing store [env: MY_ELASTICSEARCH_ENDPOINT]
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Document type appended to index paths [env: MY_ELASTICSEARCH_TYPE]
    #[arg(short, long)]
    doc_type: Option<String>,

    /// Include timestamps in log output [env: MY_TIMESTAMP]
    #[arg(long)]
    timestamps: Option<bool>,

    /// Maximum deliveries running at once [env: MY_MAX_IN_FLIGHT]
    #[arg(long)]
    max_in_flight: Option<usize>,
}

impl Cli {
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(url) = self.nats_url {
            config.nats.url = url;
        }
        if let Some(subject) = self.subject {
            config.nats.subject = subject;
        }
        if let Some(queue) = self.queue {
            config.nats.queue = Some(queue).filter(|q| !q.is_empty());
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(doc_type) = self.doc_type {
            config.doc_type = doc_type;
        }
        if let Some(show_time) = self.timestamps {
            config.show_time = show_time;
        }
        if let Some(max_in_flight) = self.max_in_flight {
            config.max_in_flight = max_in_flight;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = BridgeConfig::from_env();
    cli.apply(&mut config);

    if let Err(e) = telemetry::init(config.show_time) {
        eprintln!("{}", e);
        process::exit(1);
    }

    if let Err(e) = run(config).await {
        tracing::error!(kind = e.kind(), error = %e, "Forwarder stopped");
        process::exit(1);
    }
}

async fn run(config: BridgeConfig) -> Result<(), ForwardError> {
    config.validate()?;

    tracing::info!(
        nats_url = %config.nats.url,
        subject = %config.nats.subject,
        queue = config.nats.queue.as_deref().unwrap_or(""),
        endpoint = %config.endpoint,
        doc_type = %config.doc_type,
        show_time = config.show_time,
        max_in_flight = config.max_in_flight,
        "Dump environment"
    );

    let endpoint = EndpointClient::new(&config.endpoint, config.doc_type.clone())?;

    // An unhealthy store is reported but does not block startup
    if let Err(e) = endpoint.check_reachable().await {
        tracing::warn!(url = %config.endpoint, status = e.status(), error = %e, "Endpoint is not healthy");
    }

    let nats = NatsClient::connect(config.nats.clone()).await?;
    let subscriber = nats.subscribe().await?;

    let handler = Arc::new(MessageHandler::new(endpoint));
    let messages = subscriber.map(RawMessage::from);
    forwarder::run(handler, messages, forwarder::shutdown_signal(), config.max_in_flight).await;

    nats.close().await;
    Ok(())
}
