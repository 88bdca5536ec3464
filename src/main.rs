use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::sync::Arc;
use teloxide::Bot;

use lst_notifier::api::AssetFetcher;
use lst_notifier::cli::Cli;
use lst_notifier::config::Config;
use lst_notifier::delivery::DeliverySink;
use lst_notifier::metrics::PollMetrics;
use lst_notifier::poller::{shared_snapshot, Poller};
use lst_notifier::services::AssetCommands;
use lst_notifier::storage::SnapshotStore;
use lst_notifier::telegram::{TelegramBot, TelegramSink};
use lst_notifier::templates::{shared, TemplateSet};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    lst_notifier::logging::init(cli.log_file.as_deref(), cli.debug)?;

    info!("Starting LST notifier...");

    let config = Config::resolve(cli.config.as_deref(), cli.test_mode).context("Configuration loading failed")?;
    info!(
        "Configuration loaded ({} mode, tracking {})",
        if config.source.test_mode { "test" } else { "live" },
        config.polling.tracked_tickers.join(", ")
    );

    let templates = TemplateSet::load(&config.storage.templates_path)
        .with_context(|| format!("Failed to load templates from {}", config.storage.templates_path.display()))?;
    info!("Loaded {} templates.", templates.len());
    let templates = shared(templates);

    let source = Arc::new(AssetFetcher::for_mode(
        config.source.test_mode,
        config.source.fixture_path.clone(),
        config.source.api_url.clone(),
    )?);

    let store = SnapshotStore::new(config.storage.snapshot_path.clone());
    let snapshot = shared_snapshot(store.load().await);

    let registry = prometheus::Registry::new();
    let metrics = PollMetrics::new(&registry)?;

    let bot = Bot::new(config.telegram.bot_token.clone());
    let sink = Arc::new(TelegramSink::new(bot.clone(), config.telegram.chat_id));

    let mut poller = Poller::new(
        source.clone(),
        sink.clone(),
        templates.clone(),
        snapshot.clone(),
        store,
        config.polling.tracked_tickers.clone(),
        metrics,
    );
    match sink.resolve_target().await {
        Ok(target) => {
            info!(
                "Delivering notifications to {} ({})",
                target.title.as_deref().unwrap_or("untitled chat"),
                target.chat_id
            );
            poller = poller.with_target(target);
        }
        Err(e) => warn!("Notification chat unavailable at startup: {}", e),
    }

    let period = config.poll_interval();
    let poll_task = tokio::spawn(poller.run(period));

    let commands = AssetCommands::new(
        source,
        templates,
        snapshot,
        config.storage.templates_path.clone(),
        config.telegram.admin_id,
    );
    let telegram_bot = Arc::new(TelegramBot::new(bot, commands));

    tokio::select! {
        result = telegram_bot.start() => {
            if let Err(e) = result {
                error!("Telegram bot error: {}", e);
            }
        }
        joined = poll_task => {
            error!("Poll task stopped unexpectedly");
            if let Err(e) = joined {
                return Err(anyhow!("poll task failed: {}", e));
            }
        }
    }

    info!("Shutting down.");
    Ok(())
}
