use anyhow::Context;
use fitchallenge::config::Config;
use fitchallenge::db::{seed, InMemoryStore};
use fitchallenge::services::standings::StandingsService;
use fitchallenge::state::{AppState, SharedState};
use fitchallenge::web;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(
        "Ranking mode: {}, default timezone: {}",
        config.ranking_mode.as_str(),
        config.default_timezone
    );

    let store = InMemoryStore::new();
    match &config.seed_path {
        Some(path) => {
            tracing::info!("Loading seed data from {}", path.display());
            seed::load_file(&store, path).await?;
        }
        None => tracing::warn!("SEED_PATH not set, starting with an empty store"),
    }

    let standings = StandingsService::new(
        Arc::new(store),
        config.ranking_mode,
        config.default_timezone.clone(),
    );
    let shared: SharedState = Arc::new(AppState {
        standings,
        config: config.clone(),
    });

    // Re-aggregate every enrollment so cached totals cannot drift from check-ins
    let scheduler = JobScheduler::new().await?;
    let shared_for_reconcile = shared.clone();
    scheduler
        .add(Job::new_async(config.reconcile_cron.as_str(), move |_uuid, _l| {
            let state = shared_for_reconcile.clone();
            Box::pin(async move {
                match state.standings.reconcile_all().await {
                    Ok(0) => tracing::debug!("Reconciliation found no drift"),
                    Ok(corrected) => tracing::info!("Reconciliation corrected {} totals", corrected),
                    Err(e) => tracing::error!("Reconciliation failed: {}", e),
                }
            })
        })?)
        .await?;
    scheduler.start().await?;
    tracing::info!("Scheduler started: reconciliation on '{}'", config.reconcile_cron);

    let app = web::routes(shared)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
