//! inbox-relay - entry point for the forwarding daemon

use std::path::PathBuf;

use inbox_relay::config::Settings;
use inbox_relay::services::{ForwardService, Scheduler};
use inbox_relay::storage::CredentialStore;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("starting inbox-relay");

    if let Err(e) = run().await {
        tracing::error!("fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;

    let store = CredentialStore::new(&settings.tokens_dir);
    let accounts = store.accounts()?;
    if accounts.is_empty() {
        anyhow::bail!(
            "no credential records found in {}",
            store.dir().display()
        );
    }
    tracing::info!(
        accounts = accounts.len(),
        rules = settings.rules.len(),
        keywords = settings.keywords.len(),
        "configuration loaded"
    );

    let service = ForwardService::new(
        settings.rule_set()?,
        settings.keyword_set(),
        store,
        settings.http_timeout(),
    );

    Scheduler::new(service, settings.poll_interval()).run().await;
    Ok(())
}
