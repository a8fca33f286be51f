//! Fan-out search across every registered job source
//!
//! Sources run concurrently and fail independently: a source that errors or
//! exceeds its time budget contributes no listings and a short message in
//! the `errors` map, while the other sources are reported as usual.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::{SourceError, SourceResult};
use crate::models::{Listing, ListingPage, PaginationInfo, SearchQuery, SourceKind};
use crate::sources::{JobSource, SourceRegistry};

pub mod state_manager;

pub use state_manager::{RunState, ScrapeStateManager, SourceRunStatus};

/// Listings from one source, with the failure message when it failed
#[derive(Debug, Clone, Serialize)]
pub struct SourceJobs<T = Listing> {
    pub count: usize,
    pub jobs: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> SourceJobs<T> {
    pub fn found(jobs: Vec<T>) -> Self {
        Self {
            count: jobs.len(),
            jobs,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            count: 0,
            jobs: Vec::new(),
            error: Some(error),
        }
    }
}

/// Combined result of a search across all sources
///
/// Serializes as `{count, helloWork: {count, jobs}, wttj, indeed, all, errors}`.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedResults<T = Listing> {
    pub count: usize,
    #[serde(flatten)]
    pub by_source: BTreeMap<&'static str, SourceJobs<T>>,
    pub all: Vec<T>,
    pub errors: BTreeMap<&'static str, Option<String>>,
}

impl<T: Clone> AggregatedResults<T> {
    /// Assemble the payload from per-source outcomes given in registry order
    pub fn from_outcomes(outcomes: Vec<(SourceKind, Result<Vec<T>, String>)>) -> Self {
        let mut by_source = BTreeMap::new();
        let mut errors = BTreeMap::new();
        let mut all = Vec::new();

        for kind in SourceKind::ALL {
            by_source.insert(kind.key(), SourceJobs::found(Vec::new()));
            errors.insert(kind.key(), None);
        }

        for (kind, outcome) in outcomes {
            match outcome {
                Ok(jobs) => {
                    all.extend(jobs.iter().cloned());
                    by_source.insert(kind.key(), SourceJobs::found(jobs));
                }
                Err(message) => {
                    errors.insert(kind.key(), Some(message));
                }
            }
        }

        Self {
            count: all.len(),
            by_source,
            all,
            errors,
        }
    }

    /// Transform every listing, keeping counts and errors
    pub fn map<U, F>(self, mut f: F) -> AggregatedResults<U>
    where
        F: FnMut(T) -> U,
    {
        let by_source = self
            .by_source
            .into_iter()
            .map(|(key, bucket)| {
                let jobs: Vec<U> = bucket.jobs.into_iter().map(&mut f).collect();
                (
                    key,
                    SourceJobs {
                        count: jobs.len(),
                        jobs,
                        error: bucket.error,
                    },
                )
            })
            .collect();

        AggregatedResults {
            count: self.count,
            by_source,
            all: self.all.into_iter().map(&mut f).collect(),
            errors: self.errors,
        }
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceJobs<T>> {
        self.by_source.get(kind.key())
    }

    pub fn error(&self, kind: SourceKind) -> Option<&str> {
        self.errors.get(kind.key()).and_then(|e| e.as_deref())
    }
}

#[derive(Clone)]
pub struct Aggregator {
    registry: SourceRegistry,
    state: ScrapeStateManager,
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(registry: SourceRegistry, state: ScrapeStateManager, source_timeout: Duration) -> Self {
        Self {
            registry,
            state,
            source_timeout,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn state(&self) -> &ScrapeStateManager {
        &self.state
    }

    /// Search every source concurrently
    pub async fn search_all(&self, query: &SearchQuery) -> AggregatedResults {
        info!(
            "Searching all sources for '{}' in '{}'",
            query.job_query, query.location_query
        );

        let runs = self
            .registry
            .iter()
            .map(|source| self.run_source(source.clone(), query));
        let outcomes = join_all(runs).await;

        let results = AggregatedResults::from_outcomes(outcomes);
        info!(
            count = results.count,
            failed = results.errors.values().filter(|e| e.is_some()).count(),
            "Aggregated search finished"
        );
        results
    }

    /// Search a single source, reporting failure in the payload
    pub async fn search_one(&self, kind: SourceKind, query: &SearchQuery) -> SourceJobs {
        let source = match self.registry.get(kind) {
            Ok(source) => source,
            Err(_) => return SourceJobs::failed(kind.unavailable_message()),
        };

        match self.run_source(source, query).await.1 {
            Ok(jobs) => SourceJobs::found(jobs),
            Err(message) => SourceJobs::failed(message),
        }
    }

    pub async fn search_page(&self, kind: SourceKind, query: &SearchQuery, page: u32) -> SourceResult<ListingPage> {
        let source = self.registry.get(kind)?;
        self.with_timeout(kind, source.search_page(query, page)).await
    }

    pub async fn pagination_info(&self, kind: SourceKind, query: &SearchQuery) -> SourceResult<PaginationInfo> {
        let source = self.registry.get(kind)?;
        self.with_timeout(kind, source.pagination_info(query)).await
    }

    async fn run_source(
        &self,
        source: Arc<dyn JobSource>,
        query: &SearchQuery,
    ) -> (SourceKind, Result<Vec<Listing>, String>) {
        let kind = source.kind();
        let run_id = self.state.start_run(kind, query).await;

        match self.with_timeout(kind, source.search(query)).await {
            Ok(jobs) => {
                self.state.complete_run(kind, run_id, jobs.len()).await;
                (kind, Ok(jobs))
            }
            Err(e) => {
                warn!(source = %kind, "Search failed: {}", e);
                self.state.fail_run(kind, run_id, e.to_string()).await;
                (kind, Err(kind.unavailable_message()))
            }
        }
    }

    async fn with_timeout<T, F>(&self, kind: SourceKind, fut: F) -> SourceResult<T>
    where
        F: std::future::Future<Output = SourceResult<T>>,
    {
        tokio::time::timeout(self.source_timeout, fut)
            .await
            .map_err(|_| SourceError::timeout(kind.domain()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::PagedStub;
    use async_trait::async_trait;

    struct SlowSource;

    #[async_trait]
    impl JobSource for SlowSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Indeed
        }

        fn page_size(&self) -> u32 {
            20
        }

        async fn search_page(&self, _query: &SearchQuery, page: u32) -> SourceResult<ListingPage> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ListingPage {
                page,
                jobs: Vec::new(),
                has_next_page: false,
            })
        }
    }

    fn aggregator(sources: Vec<Arc<dyn JobSource>>) -> Aggregator {
        Aggregator::new(
            SourceRegistry::with_sources(sources),
            ScrapeStateManager::new(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_search_all_isolates_failures() {
        let aggregator = aggregator(vec![
            Arc::new(PagedStub::new(SourceKind::HelloWork, 3, 20)),
            Arc::new(PagedStub::new(SourceKind::WelcomeToTheJungle, 50, 20).failing_on(1)),
            Arc::new(SlowSource),
        ]);

        let results = aggregator.search_all(&SearchQuery::new("rust", "Paris", 10)).await;

        assert_eq!(results.count, 3);
        assert_eq!(results.all.len(), 3);
        assert_eq!(results.source(SourceKind::HelloWork).unwrap().count, 3);
        assert_eq!(results.source(SourceKind::WelcomeToTheJungle).unwrap().count, 0);
        assert_eq!(results.error(SourceKind::HelloWork), None);
        assert_eq!(
            results.error(SourceKind::WelcomeToTheJungle),
            Some("Welcome to the Jungle temporarily unavailable")
        );
        assert_eq!(results.error(SourceKind::Indeed), Some("Indeed temporarily unavailable"));

        let statuses = aggregator.state().get_all_status().await;
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].state, RunState::Completed);
        assert_eq!(statuses[1].state, RunState::Failed);
        assert_eq!(statuses[2].state, RunState::Failed);
    }

    #[tokio::test]
    async fn test_aggregated_wire_format() {
        let aggregator = aggregator(vec![
            Arc::new(PagedStub::new(SourceKind::HelloWork, 2, 20)),
            Arc::new(PagedStub::new(SourceKind::Indeed, 1, 20)),
        ]);

        let results = aggregator.search_all(&SearchQuery::new("go", "", 10)).await;
        let value = serde_json::to_value(&results).unwrap();

        assert_eq!(value["count"], 3);
        assert_eq!(value["helloWork"]["count"], 2);
        assert_eq!(value["indeed"]["jobs"].as_array().unwrap().len(), 1);
        assert_eq!(value["wttj"]["count"], 0);
        assert!(value["helloWork"].get("error").is_none());
        assert!(value["errors"]["helloWork"].is_null());
        assert_eq!(value["all"][2]["jobWebsite"], "Indeed");
    }

    #[tokio::test]
    async fn test_search_one() {
        let aggregator = aggregator(vec![Arc::new(PagedStub::new(SourceKind::HelloWork, 30, 20))]);

        let found = aggregator.search_one(SourceKind::HelloWork, &SearchQuery::new("rust", "", 25)).await;
        assert_eq!(found.count, 25);
        assert!(found.error.is_none());

        let missing = aggregator.search_one(SourceKind::Indeed, &SearchQuery::new("rust", "", 25)).await;
        assert_eq!(missing.count, 0);
        assert_eq!(missing.error.as_deref(), Some("Indeed temporarily unavailable"));
    }

    #[test]
    fn test_map_keeps_shape() {
        let results = AggregatedResults::from_outcomes(vec![
            (SourceKind::HelloWork, Ok(vec![Listing::default()])),
            (SourceKind::Indeed, Err("Indeed temporarily unavailable".to_string())),
        ]);
        let mapped = results.map(|listing| listing.title.len());
        assert_eq!(mapped.count, 1);
        assert_eq!(mapped.all, vec![0]);
        assert_eq!(mapped.error(SourceKind::Indeed), Some("Indeed temporarily unavailable"));
    }
}
