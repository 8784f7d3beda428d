// This is the entry point of the moderation worker daemon.
//
// This file's job is to:
// 1. Load configuration from the environment
// 2. Initialize stores and pick the analyzer backend (dependency injection)
// 3. Spawn the worker fleet as competing consumers
// 4. Run the background sweeps and wait for shutdown

use anyhow::Context;
use modgate::core::analysis::{Analyzer, FallbackAnalyzer, RuleBasedAnalyzer};
use modgate::core::decisions::DecisionStore;
use modgate::core::delivery::Worker;
use modgate::core::moderation::ModerationPipeline;
use modgate::infra::analysis::{ClaudeAnalyzer, HeuristicLanguageDetector};
use modgate::infra::decisions::SqliteDecisionStore;
use modgate::infra::delivery::SqliteJobQueue;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a claim may sit unacknowledged before the sweep returns it
/// to the queue for another worker.
const CLAIM_VISIBILITY: Duration = Duration::from_secs(60);

/// How often the stale-claim sweep runs.
const RECLAIM_INTERVAL: Duration = Duration::from_secs(30);

/// How often expired result/decision rows are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let database_path =
        std::env::var("MODGATE_DATABASE").unwrap_or_else(|_| "data/modgate.db".to_string());
    let worker_count: usize = std::env::var("MODGATE_WORKERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4);

    // Keep the runtime database in a dedicated folder so the repo root
    // stays tidy.
    if let Some(parent) = Path::new(&database_path).parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Wire the stores and pick the analyzer backend once, here. Everything
    // downstream works against the core traits.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", database_path))
        .await
        .context("failed to open the moderation database")?;

    let store = Arc::new(SqliteDecisionStore::new(pool.clone()));
    store
        .migrate()
        .await
        .context("failed to migrate decision tables")?;

    let bootstrap_queue = SqliteJobQueue::new(pool.clone(), "bootstrap");
    bootstrap_queue
        .migrate()
        .await
        .context("failed to migrate queue table")?;

    // The LLM backend is used when an API key is configured; either way
    // the rule-based analyzer is in the loop, as the primary or as the
    // mandatory fallback.
    let analyzer: Box<dyn Analyzer> = match std::env::var("ANTHROPIC_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => {
            tracing::info!("using LLM-backed content analysis with rule-based fallback");
            let client = match std::env::var("ANTHROPIC_MODEL") {
                Ok(model) => ClaudeAnalyzer::with_model(api_key, model),
                Err(_) => ClaudeAnalyzer::new(api_key),
            }
            .context("failed to build the LLM analyzer client")?;
            Box::new(FallbackAnalyzer::new(client))
        }
        _ => {
            tracing::info!(
                "using rule-based content analysis (set ANTHROPIC_API_KEY for LLM analysis)"
            );
            Box::new(RuleBasedAnalyzer::new())
        }
    };

    let pipeline = Arc::new(ModerationPipeline::new(
        analyzer,
        HeuristicLanguageDetector::new(),
    ));

    // ========================================================================
    // WORKER FLEET
    // ========================================================================
    // Each worker gets its own queue handle (its own consumer name) and
    // competes for jobs; the transport hands each delivery to exactly one
    // of them.

    let cancel = CancellationToken::new();
    let mut handles = Vec::with_capacity(worker_count);

    for i in 0..worker_count {
        let name = format!("worker-{i}");
        let queue = Arc::new(SqliteJobQueue::new(pool.clone(), name.clone()));
        let worker = Worker::new(name, queue, Arc::clone(&store), Arc::clone(&pipeline));
        handles.push(tokio::spawn(worker.run(cancel.clone())));
    }

    tracing::info!(workers = worker_count, "moderation workers started");

    // Background sweep: return stale claims (crashed workers) to the
    // queue so another worker picks them up.
    let reclaim_queue = SqliteJobQueue::new(pool.clone(), "reclaimer");
    let reclaim_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = reclaim_cancel.cancelled() => break,
                _ = tokio::time::sleep(RECLAIM_INTERVAL) => {}
            }
            match reclaim_queue.reclaim_stale(CLAIM_VISIBILITY).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(reclaimed = n, "returned stale claims to the queue"),
                Err(err) => tracing::warn!(error = %err, "stale claim sweep failed"),
            }
        }
    });

    // Background sweep: drop expired result and decision records.
    let purge_store = Arc::clone(&store);
    let purge_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = purge_cancel.cancelled() => break,
                _ = tokio::time::sleep(PURGE_INTERVAL) => {}
            }
            match purge_store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(purged = n, "dropped expired records"),
                Err(err) => tracing::warn!(error = %err, "record purge failed"),
            }
        }
    });

    // ========================================================================
    // SHUTDOWN
    // ========================================================================

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested, draining workers");
    cancel.cancel();

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "worker task panicked");
        }
    }

    tracing::info!("all workers stopped");
    Ok(())
}
