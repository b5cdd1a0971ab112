//! Bounded parallel validation of marketplace entries.
//!
//! Each entry is resolved and validated on the blocking pool; a semaphore
//! caps how many run at once. Scheduling stops as soon as `shutdown`
//! resolves, but jobs already started are allowed to finish.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::diagnostics::{FailureKind, Severity, ValidationResult};
use crate::engine::RuleEngine;
use crate::manifest::{ManifestEntry, MarketplaceManifest};
use crate::rules::TASK_RULE_ID;

/// Everything a marketplace run produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Every entry name, in manifest order.
    pub plugins: Vec<String>,
    /// Results in completion order; the reporter sorts them.
    pub results: Vec<ValidationResult>,
    /// Entries never scheduled because the run was interrupted.
    pub skipped: Vec<String>,
    pub interrupted: bool,
}

/// Validate every manifest entry with at most `workers` jobs in flight.
pub async fn validate_marketplace<F>(
    engine: Arc<RuleEngine>,
    manifest: &MarketplaceManifest,
    base_dir: &Path,
    workers: usize,
    shutdown: F,
) -> RunOutcome
where
    F: Future<Output = ()>,
{
    let base_dir = base_dir.to_path_buf();
    let job = move |entry: &ManifestEntry| engine.validate_entry(entry, &base_dir);
    schedule(manifest.entries(), workers, shutdown, Arc::new(job)).await
}

async fn schedule<F, J>(
    entries: &[ManifestEntry],
    workers: usize,
    shutdown: F,
    job: Arc<J>,
) -> RunOutcome
where
    F: Future<Output = ()>,
    J: Fn(&ManifestEntry) -> Vec<ValidationResult> + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut names = HashMap::new();
    let mut outcome = RunOutcome {
        plugins: entries.iter().map(|e| e.name.clone()).collect(),
        ..RunOutcome::default()
    };
    tokio::pin!(shutdown);

    debug!(plugins = entries.len(), workers, "scheduling validation");
    for (i, entry) in entries.iter().enumerate() {
        let permit = tokio::select! {
            biased;
            () = &mut shutdown => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            outcome.interrupted = true;
            outcome.skipped = entries[i..].iter().map(|e| e.name.clone()).collect();
            warn!(
                skipped = outcome.skipped.len(),
                "run interrupted; no further plugins scheduled"
            );
            break;
        };

        let job = Arc::clone(&job);
        let owned = entry.clone();
        let handle = tasks.spawn_blocking(move || {
            let _permit = permit;
            job(&owned)
        });
        names.insert(handle.id(), entry.name.clone());
    }

    loop {
        // Blocking jobs cannot be cancelled; a late interrupt only marks the run.
        let joined = if outcome.interrupted {
            tasks.join_next_with_id().await
        } else {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    outcome.interrupted = true;
                    warn!("run interrupted; waiting for plugins already in progress");
                    continue;
                }
                joined = tasks.join_next_with_id() => joined,
            }
        };
        let Some(joined) = joined else {
            break;
        };
        match joined {
            Ok((_, results)) => outcome.results.extend(results),
            Err(e) => {
                let plugin = names.get(&e.id()).cloned().unwrap_or_default();
                error!(plugin = %plugin, error = %e, "validation task failed");
                outcome.results.push(ValidationResult::fail(
                    plugin,
                    TASK_RULE_ID,
                    Severity::Error,
                    FailureKind::InternalIo,
                    format!("validation task failed: {e}"),
                ));
            }
        }
    }
    outcome
}

/// Resolves on the first Ctrl-C. If the signal handler cannot be installed
/// the future never resolves.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for interrupts");
        std::future::pending::<()>().await;
    }
    info!("interrupt received; finishing plugins already in progress");
}
