//! Run command implementation

use crate::config::{Commitment, Config};
use crate::session::{SessionConfig, SubscriptionSession};
use crate::sink::{JsonLinesSink, LogSink, OutputSink};
use clap::{Args, ValueEnum};

/// How price events are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Structured log lines
    Log,
    /// One JSON object per line on stdout
    Json,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// WebSocket endpoint (overrides feed.ws_url)
    #[arg(long)]
    pub url: Option<String>,

    /// Account address (overrides feed.account)
    #[arg(long)]
    pub account: Option<String>,

    /// Commitment level (overrides feed.commitment)
    #[arg(long)]
    pub commitment: Option<Commitment>,

    /// Minimum milliseconds between emitted updates (overrides gate.min_interval_ms)
    #[arg(long)]
    pub min_interval_ms: Option<u64>,

    /// Output format for price events
    #[arg(long, value_enum, default_value = "log")]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Apply command line overrides on top of the file configuration
    pub fn apply(&self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(url) = &self.url {
            config.feed.ws_url = url.clone();
        }
        if let Some(account) = &self.account {
            config.feed.account = account.clone();
        }
        if let Some(commitment) = self.commitment {
            config.feed.commitment = commitment;
        }
        if let Some(min_interval_ms) = self.min_interval_ms {
            config.gate.min_interval_ms = min_interval_ms;
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = self.apply(config)?;
        let session_config = SessionConfig::from_config(&config);

        let sink: Box<dyn OutputSink> = match self.format {
            OutputFormat::Log => Box::new(LogSink::new()),
            OutputFormat::Json => Box::new(JsonLinesSink::stdout()),
        };

        let mut session = SubscriptionSession::new(session_config, sink);
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        };

        let stats = session.run(shutdown).await?;
        tracing::info!(
            received = stats.notifications_received,
            admitted = stats.notifications_admitted,
            observations = stats.observations,
            decode_errors = stats.decode_errors,
            parse_errors = stats.parse_errors,
            "Subscription session finished"
        );
        Ok(())
    }
}
