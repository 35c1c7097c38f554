// ABOUTME: Command-line tool for exercising provider connectors outside the platform
// ABOUTME: Prints authorization URLs, streams activities, and normalizes saved payloads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Show configured connectors and their capabilities
//! pierre-connectors providers
//!
//! # Print the URL to send a user to
//! pierre-connectors auth-url --provider strava --state csrf123 --redirect-uri http://localhost:8081/callback
//!
//! # Stream normalized activities for an access token
//! pierre-connectors activities --provider coros --token "$COROS_TOKEN" --limit 20
//!
//! # Normalize a saved provider payload (object or array)
//! pierre-connectors normalize --provider garmin --file activity.json
//!
//! # Decode a saved webhook body
//! pierre-connectors webhook --provider strava --file event.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use pierre_connectors::config::{ConnectorConfig, ProviderSettings};
use pierre_connectors::connectors::{ActivityQuery, ActivityStreamExt, ConnectorRegistry, StreamConfig};
use pierre_connectors::logging::{init_logging, LoggingConfig};
use pierre_connectors::models::{AccessToken, Provider};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "pierre-connectors",
    about = "Pierre fitness provider connector tool",
    long_about = "Exercise the Strava, Garmin, Polar and COROS connectors: authorization URLs, activity ingestion and payload normalization."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// List configured connectors
    Providers,

    /// Print the authorization URL for a provider
    AuthUrl {
        /// Provider name (strava, garmin, polar, coros)
        #[arg(long)]
        provider: Provider,

        /// CSRF state to round-trip through the provider
        #[arg(long)]
        state: String,

        /// Callback URL registered with the provider
        #[arg(long)]
        redirect_uri: String,
    },

    /// Stream normalized activities as JSON lines
    Activities {
        /// Provider name
        #[arg(long)]
        provider: Provider,

        /// Access token
        #[arg(long, env = "PIERRE_ACCESS_TOKEN")]
        token: String,

        /// OAuth 1.0a token secret (Garmin)
        #[arg(long)]
        token_secret: Option<String>,

        /// Provider user id (Polar)
        #[arg(long)]
        user_id: Option<String>,

        /// Stop after this many activities
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Page size
        #[arg(long, default_value_t = 50)]
        page_size: u32,
    },

    /// Normalize a saved raw activity payload
    Normalize {
        /// Provider name
        #[arg(long)]
        provider: Provider,

        /// JSON file holding one activity or an array of activities
        #[arg(long)]
        file: PathBuf,
    },

    /// Decode a saved webhook body
    Webhook {
        /// Provider name
        #[arg(long)]
        provider: Provider,

        /// JSON file holding the webhook body
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        "debug".clone_into(&mut logging.level);
    }
    init_logging(&logging)?;

    let config = ConnectorConfig::from_env().context("failed to load connector configuration")?;

    match cli.command {
        Command::Providers => list_providers(&config)?,
        Command::AuthUrl {
            provider,
            state,
            redirect_uri,
        } => {
            let registry = ConnectorRegistry::from_config(&config)?;
            let url = registry
                .get(provider)?
                .get_authorization_url(&state, &redirect_uri)
                .await?;
            println!("{url}");
        }
        Command::Activities {
            provider,
            token,
            token_secret,
            user_id,
            limit,
            page_size,
        } => {
            let mut access = token_secret.map_or_else(
                || AccessToken::bearer(token.clone()),
                |secret| AccessToken::oauth1(token.clone(), secret),
            );
            if let Some(user_id) = user_id {
                access = access.with_user_id(user_id);
            }
            stream_activities(&config, provider, &access, limit, page_size).await?;
        }
        Command::Normalize { provider, file } => {
            let registry = offline_registry(&config)?;
            let connector = registry.get(provider)?;
            let records = match read_json(&file)? {
                Value::Array(records) => records,
                single => vec![single],
            };
            for raw in &records {
                let activity = connector.normalize_activity(raw);
                println!("{}", serde_json::to_string_pretty(&activity)?);
            }
            info!(count = records.len(), "normalized payload");
        }
        Command::Webhook { provider, file } => {
            let registry = offline_registry(&config)?;
            let connector = registry.get(provider)?;
            match connector.handle_webhook(&read_json(&file)?) {
                Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
                None => warn!("webhook payload ignored"),
            }
        }
    }

    Ok(())
}

fn list_providers(config: &ConnectorConfig) -> Result<()> {
    let registry = ConnectorRegistry::from_config(config)?;
    if registry.providers().is_empty() {
        println!("No providers configured. Set PIERRE_<PROVIDER>_CLIENT_ID and PIERRE_<PROVIDER>_CLIENT_SECRET.");
        return Ok(());
    }
    for provider in registry.providers() {
        let capabilities = registry.get(provider)?.capabilities();
        let names = capabilities
            .iter_names()
            .map(|(name, _)| name.to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<8} {names}", provider.display_name());
    }
    Ok(())
}

async fn stream_activities(
    config: &ConnectorConfig,
    provider: Provider,
    access: &AccessToken,
    limit: usize,
    page_size: u32,
) -> Result<()> {
    let registry = ConnectorRegistry::from_config(config)?;
    let connector = registry.get(provider)?;
    let stream_config = StreamConfig::with_page_size(page_size).with_max_activities(limit);

    let mut stream = connector.activities_stream(access, ActivityQuery::default(), stream_config);
    let mut imported = 0_usize;
    while let Some(result) = stream.next().await {
        match result {
            Ok(activity) => {
                imported += 1;
                println!("{}", serde_json::to_string(&activity)?);
            }
            Err(e) if e.requires_reauthentication() || e.is_retryable() => {
                return Err(e).context("activity ingestion stopped");
            }
            Err(e) => warn!(error = %e, "skipping activity"),
        }
    }
    info!(provider = %provider, imported, "activity stream finished");
    Ok(())
}

/// Registry usable for pure operations even when credentials are missing
fn offline_registry(config: &ConnectorConfig) -> Result<ConnectorRegistry> {
    let mut config = config.clone();
    for provider in Provider::CONNECTED {
        if config.settings(provider).is_none() {
            config = config.with_provider(provider, ProviderSettings::new(provider, "", ""));
        }
    }
    Ok(ConnectorRegistry::from_config(&config)?)
}

fn read_json(path: &Path) -> Result<Value> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("{} is not valid JSON", path.display()))
}
