//! Runs one ad-hoc huddle session from environment configuration.

mod config;

use config::DispatcherConfig;
use huddle_integration::{GuestIssuer, TwilioTelephony, WebexPlatform, WebhookInbox};
use huddle_session::{Collaborators, SessionOrchestrator};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn orchestrator(config: DispatcherConfig) -> SessionOrchestrator {
    let profile = config.call_profile();
    let http = &config.http;

    let collaborators = Collaborators {
        identity: Arc::new(GuestIssuer::new(
            config.identity,
            config.platform.api_base.clone(),
            http,
        )),
        platform: Arc::new(WebexPlatform::new(&config.platform, http)),
        relay: Arc::new(WebhookInbox::new(&config.relay, http)),
        telephony: Arc::new(TwilioTelephony::new(config.telephony, http)),
    };

    SessionOrchestrator::new(collaborators, profile, config.session)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match DispatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        title = %config.session.title,
        contacts = config.session.contacts().len(),
        "Loaded configuration"
    );

    let report = orchestrator(config).run().await;
    println!("{report}");

    match report.outcome() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(
                stage = ?report.failed_stage,
                "huddle failed: {error}"
            );
            ExitCode::FAILURE
        }
    }
}
