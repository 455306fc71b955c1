//! Batch status enrichment.
//!
//! [`Enricher`] ties the pieces together: every citation becomes one task,
//! cached identities are answered immediately, and everything else waits at
//! an admission gate (a counting semaphore) before the [`ResolutionPolicy`]
//! runs its checker chain. At most `max_concurrent` lookups are past the gate
//! at any moment.
//!
//! ```rust,no_run
//! use normdoc_status::config::Config;
//! use normdoc_status::enrich::Enricher;
//! use normdoc_status::models::Citation;
//! use normdoc_status::sources::CheckerRegistry;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let registry = CheckerRegistry::from_config(&config)?;
//! let enricher = Enricher::from_config(&config, &registry)?;
//!
//! let enriched = enricher
//!     .enrich_batch(vec![Citation::new("Постановление Правительства РФ", "1479")])
//!     .await;
//! println!("{}", enriched[0].status);
//! # Ok(())
//! # }
//! ```

mod policy;

pub use policy::{Chain, PolicyError, ResolutionPolicy, Route};

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::models::{Citation, EnrichedCitation, Status};
use crate::sources::CheckerRegistry;
use crate::utils::StatusCache;

/// A citation whose lookup task failed
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub citation: Citation,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Surviving citations, in input order
    pub enriched: Vec<EnrichedCitation>,

    /// Citations dropped from `enriched`, in input order
    pub failures: Vec<BatchFailure>,
}

/// Concurrent, cached status lookups behind an admission gate
#[derive(Debug, Clone)]
pub struct Enricher {
    policy: Arc<ResolutionPolicy>,
    cache: Arc<StatusCache>,
    gate: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Enricher {
    /// Create an enricher with a fresh cache. A limit of 0 is raised to 1.
    pub fn new(policy: ResolutionPolicy, max_concurrent: usize) -> Self {
        Self::with_cache(policy, Arc::new(StatusCache::new()), max_concurrent)
    }

    /// Create an enricher that shares an existing cache
    pub fn with_cache(
        policy: ResolutionPolicy,
        cache: Arc<StatusCache>,
        max_concurrent: usize,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            policy: Arc::new(policy),
            cache,
            gate: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn from_config(config: &Config, registry: &CheckerRegistry) -> Result<Self, PolicyError> {
        let policy = ResolutionPolicy::from_config(&config.policy, registry)?;
        Ok(Self::new(
            policy,
            config.concurrency.max_concurrent_lookups,
        ))
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Resolve one citation through the cache, the gate and the policy
    pub async fn enrich_one(&self, citation: Citation) -> EnrichedCitation {
        let status = self.lookup(&citation).await;
        EnrichedCitation::new(citation, status)
    }

    /// Resolve every citation, dropping those whose lookup failed
    pub async fn enrich_batch(&self, citations: Vec<Citation>) -> Vec<EnrichedCitation> {
        self.enrich_batch_report(citations).await.enriched
    }

    /// Resolve every citation and report which ones were dropped.
    ///
    /// Dropping the returned future aborts all lookups still running.
    pub async fn enrich_batch_report(&self, citations: Vec<Citation>) -> BatchReport {
        let mut tasks = JoinSet::new();
        for (index, citation) in citations.iter().cloned().enumerate() {
            let enricher = self.clone();
            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(enricher.lookup(&citation))
                    .catch_unwind()
                    .await;
                (index, outcome)
            });
        }

        let mut statuses: Vec<Option<Status>> = vec![None; citations.len()];
        let mut failed: Vec<(usize, String)> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(status))) => statuses[index] = Some(status),
                Ok((index, Err(payload))) => {
                    let error = panic_message(payload.as_ref());
                    tracing::error!(
                        citation = %citations[index].key(),
                        error = %error,
                        "Lookup failed, citation dropped"
                    );
                    failed.push((index, error));
                }
                // Only reachable when the runtime is shutting down.
                Err(e) => tracing::error!(error = %e, "Lookup task did not complete"),
            }
        }

        failed.sort_by_key(|(index, _)| *index);
        let failures = failed
            .into_iter()
            .map(|(index, error)| BatchFailure {
                citation: citations[index].clone(),
                error,
            })
            .collect();

        let enriched = citations
            .into_iter()
            .zip(statuses)
            .filter_map(|(citation, status)| {
                status.map(|status| EnrichedCitation::new(citation, status))
            })
            .collect();

        BatchReport { enriched, failures }
    }

    async fn lookup(&self, citation: &Citation) -> Status {
        let key = citation.key();

        if let Some(status) = self.cache.peek(&key) {
            tracing::debug!(citation = %key, status = %status, "Cache hit before admission");
            return status;
        }

        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self.gate.acquire().await.ok();

        self.cache
            .get_or_resolve(key, self.policy.resolve(citation))
            .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "lookup panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::sources::MockChecker;
    use crate::utils::log_capture::LogCapture;
    use std::time::Duration;

    fn enricher_with(pravo: Arc<MockChecker>, max_concurrent: usize) -> Enricher {
        let mut registry = CheckerRegistry::new();
        registry.register(pravo);
        registry.register(Arc::new(MockChecker::new("consultant", Status::NotFound)));

        let policy = ResolutionPolicy::from_config(&PolicyConfig::default(), &registry).unwrap();
        Enricher::new(policy, max_concurrent)
    }

    fn citations(count: usize) -> Vec<Citation> {
        (0..count)
            .map(|i| Citation::new("Приказ", i.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_gate_bounds_in_flight_lookups() {
        let pravo = Arc::new(
            MockChecker::new("pravo", Status::Active).with_delay(Duration::from_millis(20)),
        );
        let enricher = enricher_with(pravo.clone(), 5);

        let enriched = enricher.enrich_batch(citations(50)).await;

        assert_eq!(enriched.len(), 50);
        assert_eq!(pravo.calls(), 50);
        assert!(pravo.max_in_flight() <= 5, "{}", pravo.max_in_flight());
        assert!(pravo.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_repeated_identity_is_looked_up_once() {
        let pravo = Arc::new(MockChecker::new("pravo", Status::Repealed));
        let enricher = enricher_with(pravo.clone(), 1);

        let first = enricher.enrich_one(Citation::new("Приказ", "12")).await;
        let second = enricher.enrich_one(Citation::new("Приказ", "12")).await;

        assert_eq!(first.status, Status::Repealed);
        assert_eq!(second.status, Status::Repealed);
        assert_eq!(pravo.calls(), 1);
        assert_eq!(enricher.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_behind_single_permit_share_result() {
        let pravo = Arc::new(
            MockChecker::new("pravo", Status::Active).with_delay(Duration::from_millis(10)),
        );
        let enricher = enricher_with(pravo.clone(), 1);
        let batch = vec![Citation::new("Приказ", "12"); 4];

        let enriched = enricher.enrich_batch(batch).await;

        assert_eq!(enriched.len(), 4);
        assert_eq!(pravo.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_lookups_are_dropped_and_reported() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let pravo = Arc::new(MockChecker::new("pravo", Status::Active));
        pravo.set_status("4", Status::Repealed);
        pravo.panic_on("3");
        pravo.panic_on("7");
        let enricher = enricher_with(pravo, 5);

        let report = enricher.enrich_batch_report(citations(10)).await;

        let numbers: Vec<&str> = report
            .enriched
            .iter()
            .map(|e| e.citation.number.as_str())
            .collect();
        assert_eq!(numbers, vec!["0", "1", "2", "4", "5", "6", "8", "9"]);
        assert_eq!(report.enriched[3].status, Status::Repealed);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].citation.number, "3");
        assert_eq!(report.failures[1].citation.number, "7");
        assert!(report.failures[0].error.contains("3"));

        let dropped = logs.lines_at("ERROR");
        assert_eq!(dropped.len(), 2, "{}", logs.contents());
        assert!(dropped.iter().any(|line| line.contains("Приказ 3")));
        assert!(dropped.iter().any(|line| line.contains("Приказ 7")));
    }

    #[tokio::test]
    async fn test_extra_fields_survive() {
        let pravo = Arc::new(MockChecker::new("pravo", Status::Active));
        let enricher = enricher_with(pravo, 5);
        let citation = Citation::new("Приказ", "1").with_extra("Страница", 14);

        let enriched = enricher.enrich_batch(vec![citation]).await;

        assert_eq!(enriched[0].citation.extra["Страница"], 14);
    }

    #[tokio::test]
    async fn test_dropping_batch_cancels_lookups() {
        let pravo = Arc::new(
            MockChecker::new("pravo", Status::Active).with_delay(Duration::from_millis(50)),
        );
        let enricher = enricher_with(pravo.clone(), 1);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(75),
            enricher.enrich_batch(citations(10)),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(pravo.calls() <= 2, "{}", pravo.calls());
    }

    #[test]
    fn test_zero_limit_is_raised() {
        let pravo = Arc::new(MockChecker::new("pravo", Status::Active));
        assert_eq!(enricher_with(pravo, 0).max_concurrent(), 1);
    }
}
