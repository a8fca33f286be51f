//! Job board sources
//!
//! Every job board sits behind the [`JobSource`] trait. Page based boards
//! (HelloWork, Welcome to the Jungle) implement `search_page` and inherit
//! the shared pagination loop; the Indeed API proxy answers a whole search
//! in one call and overrides `search`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::{Listing, ListingPage, PaginationInfo, SearchQuery, SourceKind};

pub mod extract;
pub mod fetcher;
pub mod hellowork;
pub mod indeed;
pub mod wttj;

pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use hellowork::HelloWorkSource;
pub use indeed::IndeedSource;
pub use wttj::WttjSource;

#[async_trait]
pub trait JobSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Listings shown per result page on the board
    fn page_size(&self) -> u32;

    /// Pause between two page fetches
    fn page_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<ListingPage>;

    async fn search(&self, query: &SearchQuery) -> SourceResult<Vec<Listing>> {
        paginate(self, query).await
    }

    async fn pagination_info(&self, query: &SearchQuery) -> SourceResult<PaginationInfo> {
        let first = self.search_page(query, 1).await?;
        Ok(PaginationInfo {
            source: self.kind(),
            page_size: self.page_size(),
            first_page_count: first.jobs.len(),
            has_next_page: first.has_next_page,
            estimated_pages: None,
        })
    }
}

/// Number of pages needed to collect `results_wanted` listings
pub fn max_pages(results_wanted: u32, page_size: u32) -> u32 {
    results_wanted.div_ceil(page_size.max(1)).max(1)
}

/// Walk result pages until enough listings are collected
///
/// A failure on the first page fails the search. Later failures end the walk
/// and keep what was already collected.
pub async fn paginate<S>(source: &S, query: &SearchQuery) -> SourceResult<Vec<Listing>>
where
    S: JobSource + ?Sized,
{
    let kind = source.kind();
    let wanted = query.results_wanted as usize;
    let last_page = max_pages(query.results_wanted, source.page_size());
    let mut jobs: Vec<Listing> = Vec::new();
    let mut page = 1;

    info!(source = %kind, results_wanted = wanted, max_pages = last_page, "Starting search");

    while jobs.len() < wanted && page <= last_page {
        debug!(source = %kind, page, "Fetching result page");

        let result = match source.search_page(query, page).await {
            Ok(result) => result,
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(source = %kind, page, "Stopping pagination after error: {}", e);
                break;
            }
        };

        if page == 1 && result.jobs.is_empty() {
            info!(source = %kind, "No results found");
            return Ok(Vec::new());
        }

        let found = result.jobs.len();
        jobs.extend(result.jobs);
        debug!(source = %kind, page, found, total = jobs.len(), "Page scraped");

        if jobs.len() >= wanted || page >= last_page {
            break;
        }
        if !result.has_next_page {
            debug!(source = %kind, "No more pages available");
            break;
        }

        page += 1;
        sleep_with_jitter(source.page_delay()).await;
    }

    jobs.truncate(wanted);
    info!(source = %kind, count = jobs.len(), "Search finished");
    Ok(jobs)
}

async fn sleep_with_jitter(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    let jitter_ms = fastrand::u64(0..=(delay.as_millis() as u64 / 4));
    tokio::time::sleep(delay + Duration::from_millis(jitter_ms)).await;
}

/// The enabled sources, in aggregation order
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn JobSource>>,
}

impl SourceRegistry {
    /// Build the enabled sources from configuration sharing one HTTP fetcher
    pub fn from_config(config: &ScraperConfig) -> SourceResult<Self> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(config)?);
        let mut sources: Vec<Arc<dyn JobSource>> = Vec::new();

        if config.hellowork.enabled {
            sources.push(Arc::new(HelloWorkSource::new(
                fetcher.clone(),
                config.hellowork.clone(),
                config.page_delay(),
            )));
        }
        if config.wttj.enabled {
            sources.push(Arc::new(WttjSource::new(
                fetcher.clone(),
                config.wttj.clone(),
                config.page_delay(),
            )?));
        }
        if config.indeed.enabled {
            sources.push(Arc::new(IndeedSource::new(fetcher, config.indeed.clone())));
        }

        info!(
            "Registered job sources: {}",
            sources
                .iter()
                .map(|s| s.kind().display_name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self { sources })
    }

    pub fn with_sources(sources: Vec<Arc<dyn JobSource>>) -> Self {
        Self { sources }
    }

    pub fn get(&self, kind: SourceKind) -> SourceResult<Arc<dyn JobSource>> {
        self.sources
            .iter()
            .find(|s| s.kind() == kind)
            .cloned()
            .ok_or_else(|| SourceError::unavailable(kind.display_name()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn JobSource>> {
        self.sources.iter()
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves `total` generated listings in pages of `page_size`
    pub struct PagedStub {
        pub kind: SourceKind,
        pub total: usize,
        pub page_size: u32,
        pub fail_on_page: Option<u32>,
        pub calls: AtomicU32,
    }

    impl PagedStub {
        pub fn new(kind: SourceKind, total: usize, page_size: u32) -> Self {
            Self {
                kind,
                total,
                page_size,
                fail_on_page: None,
                calls: AtomicU32::new(0),
            }
        }

        pub fn failing_on(mut self, page: u32) -> Self {
            self.fail_on_page = Some(page);
            self
        }
    }

    #[async_trait]
    impl JobSource for PagedStub {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn page_size(&self) -> u32 {
            self.page_size
        }

        async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<ListingPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_page == Some(page) {
                return Err(SourceError::Http {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let start = ((page - 1) * self.page_size) as usize;
            let end = (start + self.page_size as usize).min(self.total);
            let jobs = (start..end.max(start))
                .map(|i| Listing {
                    title: format!("{} #{}", query.job_query, i),
                    url: format!("https://{}/jobs/{}", self.kind.domain(), i),
                    job_website: self.kind.display_name().to_string(),
                    ..Default::default()
                })
                .collect();
            Ok(ListingPage {
                page,
                jobs,
                has_next_page: end < self.total,
            })
        }
    }
}
