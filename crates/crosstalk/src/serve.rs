// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crosstalk serve` command implementation.
//!
//! Starts the full engine: SQLite storage, the trained intent classifier,
//! transport adapters resolved from stored channel rows, the conversation
//! engine, and the background jobs (dispatch worker, scheduled sweep,
//! delivery reconciliation, classifier retrain, metrics rollup). Runs until
//! SIGINT/SIGTERM, then drains gracefully.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crosstalk_config::model::CrosstalkConfig;
use crosstalk_core::types::ChannelKind;
use crosstalk_core::{CrosstalkError, TrainableClassifier, TransportAdapter};
use crosstalk_email::EmailTransport;
use crosstalk_engine::{
    ChannelRegistry, ConversationEngine, DeliveryTracker, Dispatcher, MetricsRollup,
    ResponseTexts, jobs, shutdown,
};
use crosstalk_intent::PhraseClassifier;
use crosstalk_policy::HandoffPolicy;
use crosstalk_storage::Database;
use crosstalk_storage::queries::{channels, intents};
use crosstalk_webchat::WebchatTransport;
use crosstalk_whatsapp::WhatsappTransport;

/// How often the dispatch worker re-polls an empty queue.
const DISPATCH_POLL: Duration = Duration::from_secs(1);

/// Initialize the tracing subscriber from the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the channel registry from stored channel rows and adapter config.
///
/// Channels whose transport is not configured (no SMTP host, no gateway
/// credentials) are skipped with a warning rather than failing startup.
async fn build_registry(
    db: &Database,
    config: &CrosstalkConfig,
) -> Result<ChannelRegistry, CrosstalkError> {
    let mut registry = ChannelRegistry::new();

    for channel in channels::list_active_channels(db).await? {
        let adapter: Option<Arc<dyn TransportAdapter>> = match channel.kind {
            ChannelKind::Email => {
                if config.email.smtp_host.is_some() {
                    Some(Arc::new(EmailTransport::new(&config.email)?))
                } else {
                    None
                }
            }
            ChannelKind::Whatsapp => {
                if config.whatsapp.account_sid.is_some() {
                    Some(Arc::new(WhatsappTransport::new(&config.whatsapp)?))
                } else {
                    None
                }
            }
            ChannelKind::Webchat => {
                if config.webchat.enabled {
                    Some(Arc::new(WebchatTransport::new(&config.webchat)))
                } else {
                    None
                }
            }
        };

        match adapter {
            Some(adapter) => registry.register(channel.id.clone(), adapter),
            None => warn!(
                channel_id = channel.id.as_str(),
                kind = %channel.kind,
                "channel skipped: transport not configured"
            ),
        }
    }

    Ok(registry)
}

/// Runs the `crosstalk serve` command.
pub async fn run_serve(config: CrosstalkConfig) -> Result<(), CrosstalkError> {
    init_tracing(&config.engine.log_level);
    info!(engine = config.engine.name.as_str(), "starting crosstalk serve");

    // Storage.
    let db = Arc::new(Database::open(&config.storage.database_path).await?);

    // Transport adapters for every stored active channel.
    let registry = Arc::new(build_registry(&db, &config).await?);
    if registry.is_empty() {
        warn!("no transport adapters registered; outbound dispatch will fail until channels are configured");
    }

    // Classifier, trained from stored intents before the first turn.
    let classifier = Arc::new(PhraseClassifier::new(config.classifier.min_similarity));
    let stored_intents = intents::list_intents(&db).await?;
    classifier.retrain(&stored_intents);

    // Dispatch, delivery, and rollup components.
    let dispatcher = Arc::new(Dispatcher::new(
        db.clone(),
        registry.clone(),
        Duration::from_secs(config.dispatch.timeout_secs),
    ));
    let tracker = Arc::new(DeliveryTracker::new(
        db.clone(),
        registry.clone(),
        config.delivery.reconcile_batch_size,
    ));
    let rollup = Arc::new(MetricsRollup::new(
        db.clone(),
        Duration::from_secs(config.metrics.completion_idle_hours * 3600),
    ));

    // The conversation engine. Held for the serving shim (HTTP/webhook
    // layer); inbound events enter through its `handle_inbound`.
    let _engine = Arc::new(ConversationEngine::new(
        db.clone(),
        classifier.clone(),
        HandoffPolicy::new(config.policy.handoff_floor),
        ResponseTexts {
            handoff_notice: config.engine.handoff_notice.clone(),
            generic_fallback: config.engine.fallback_response.clone(),
        },
        dispatcher.clone(),
    ));

    // Signal handling and background jobs.
    let cancel = shutdown::install_signal_handler();
    let handles = vec![
        jobs::spawn_dispatch_worker(dispatcher.clone(), DISPATCH_POLL, cancel.clone()),
        jobs::spawn_dispatch_sweeper(
            dispatcher,
            Duration::from_secs(config.dispatch.sweep_interval_secs),
            cancel.clone(),
        ),
        jobs::spawn_reconciler(
            tracker,
            Duration::from_secs(config.delivery.reconcile_interval_secs),
            cancel.clone(),
        ),
        jobs::spawn_retrainer(
            db.clone(),
            classifier,
            Duration::from_secs(config.classifier.retrain_interval_secs),
            cancel.clone(),
        ),
        jobs::spawn_metrics_rollup(
            rollup,
            Duration::from_secs(config.metrics.rollup_interval_secs),
            cancel.clone(),
        ),
    ];
    info!(jobs = handles.len(), "background jobs started");

    // Run until a shutdown signal arrives.
    cancel.cancelled().await;

    info!("draining background jobs");
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "background job join error");
        }
    }

    registry.shutdown_all().await;
    db.close().await?;
    info!("crosstalk serve stopped");
    Ok(())
}
