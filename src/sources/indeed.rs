//! Indeed listings served by a local search API
//!
//! The API answers a whole search in one JSON array. Field names vary
//! between API versions, so each listing field accepts a couple of aliases.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{JobSource, PageFetcher};
use crate::config::IndeedConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::{Listing, ListingPage, PaginationInfo, SearchQuery, SourceKind};

const JOB_WEBSITE: &str = "Indeed";

pub struct IndeedSource {
    fetcher: Arc<dyn PageFetcher>,
    config: IndeedConfig,
}

impl IndeedSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: IndeedConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn request_url(&self, query: &SearchQuery, results_wanted: u32) -> String {
        format!(
            "{}?search_term={}&location={}&results_wanted={}",
            self.config.api_url,
            urlencoding::encode(&query.job_query),
            urlencoding::encode(&query.location_query),
            results_wanted
        )
    }

    async fn fetch_listings(&self, query: &SearchQuery, results_wanted: u32) -> SourceResult<Vec<Listing>> {
        let url = self.request_url(query, results_wanted);
        debug!(source = %self.kind(), "Searching with URL: {}", url);

        let body = self.fetcher.fetch_json(&url).await?;
        parse_listings(&body)
    }
}

/// Parse the API response body into listings
pub fn parse_listings(body: &str) -> SourceResult<Vec<Listing>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SourceError::parse_error(JOB_WEBSITE, format!("invalid JSON response: {}", e)))?;

    let Value::Array(items) = value else {
        debug!("Indeed response is not an array, ignoring");
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .map(listing_from)
        .filter(|job| !job.title.is_empty())
        .collect())
}

fn listing_from(job: &Map<String, Value>) -> Listing {
    let site = field(job, &["site"]);
    Listing {
        title: field(job, &["title", "job_title"]),
        company_name: field(job, &["company", "company_name"]),
        location: field(job, &["location"]),
        job_post_date: field(job, &["post_date", "date_posted"]),
        job_type: non_empty(field(job, &["type", "job_type"])),
        url: field(job, &["url", "job_url"]),
        image: field(job, &["image", "company_logo"]),
        company_logo: field(job, &["company_logo", "logo"]),
        job_website: if site.is_empty() { JOB_WEBSITE.to_string() } else { site },
        description: non_empty(field(job, &["description", "job_description"])),
        salary: non_empty(field(job, &["salary"])),
    }
}

/// First non-empty value among `keys`, rendered as text
fn field(job: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| job.get(*key))
        .map(as_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl JobSource for IndeedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Indeed
    }

    fn page_size(&self) -> u32 {
        self.config.page_size
    }

    async fn search(&self, query: &SearchQuery) -> SourceResult<Vec<Listing>> {
        let mut jobs = self.fetch_listings(query, query.results_wanted).await?;
        jobs.truncate(query.results_wanted as usize);
        info!(source = %self.kind(), count = jobs.len(), "Search finished");
        Ok(jobs)
    }

    /// The API has no paging, so page N asks for N pages worth and slices
    async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<ListingPage> {
        let page_size = self.config.page_size.max(1) as usize;
        let start = (page.max(1) as usize - 1) * page_size;
        let wanted = page.max(1).saturating_mul(self.config.page_size.max(1));

        let jobs: Vec<Listing> = self
            .fetch_listings(query, wanted)
            .await?
            .into_iter()
            .skip(start)
            .take(page_size)
            .collect();
        let has_next_page = jobs.len() == page_size;

        Ok(ListingPage {
            page,
            jobs,
            has_next_page,
        })
    }

    async fn pagination_info(&self, query: &SearchQuery) -> SourceResult<PaginationInfo> {
        let first = self.search_page(query, 1).await?;
        Ok(PaginationInfo {
            source: self.kind(),
            page_size: self.config.page_size,
            first_page_count: first.jobs.len(),
            has_next_page: first.has_next_page,
            estimated_pages: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::fetcher::testing::StaticFetcher;
    use serde_json::json;

    fn api_body(count: usize) -> String {
        let jobs: Vec<Value> = (0..count)
            .map(|i| json!({ "title": format!("Job {}", i), "job_url": format!("https://fr.indeed.com/viewjob?jk={}", i) }))
            .collect();
        Value::Array(jobs).to_string()
    }

    fn source(fetcher: Arc<StaticFetcher>, page_size: u32) -> IndeedSource {
        IndeedSource::new(
            fetcher,
            IndeedConfig {
                api_url: "http://api.local/jobs".to_string(),
                page_size,
                ..IndeedConfig::default()
            },
        )
    }

    #[test]
    fn test_field_aliases() {
        let body = json!([
            {
                "job_title": "Rust developer",
                "company_name": "Acme",
                "location": "Lyon, FR",
                "date_posted": "2025-03-01",
                "job_type": "fulltime",
                "job_url": "https://fr.indeed.com/viewjob?jk=1",
                "company_logo": "https://logos.example/acme.png",
                "site": "",
                "salary": 52000,
                "description": null
            },
            {
                "title": "Ops",
                "company": "Globex",
                "url": "https://fr.indeed.com/viewjob?jk=2",
                "image": "https://img.example/2.png",
                "logo": "https://logos.example/globex.png",
                "site": "glassdoor"
            },
            { "title": "", "company": "No title" },
            "not an object"
        ])
        .to_string();

        let jobs = parse_listings(&body).unwrap();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.title, "Rust developer");
        assert_eq!(first.company_name, "Acme");
        assert_eq!(first.job_post_date, "2025-03-01");
        assert_eq!(first.job_type.as_deref(), Some("fulltime"));
        assert_eq!(first.url, "https://fr.indeed.com/viewjob?jk=1");
        assert_eq!(first.image, "https://logos.example/acme.png");
        assert_eq!(first.company_logo, "https://logos.example/acme.png");
        assert_eq!(first.job_website, "Indeed");
        assert_eq!(first.salary.as_deref(), Some("52000"));
        assert_eq!(first.description, None);

        let second = &jobs[1];
        assert_eq!(second.image, "https://img.example/2.png");
        assert_eq!(second.company_logo, "https://logos.example/globex.png");
        assert_eq!(second.job_website, "glassdoor");
        assert_eq!(second.job_type, None);
    }

    #[test]
    fn test_non_array_body_yields_nothing() {
        assert!(parse_listings(r#"{"detail": "rate limited"}"#).unwrap().is_empty());
        assert!(parse_listings("<html>").is_err());
    }

    #[tokio::test]
    async fn test_search_requests_results_wanted() {
        let url = "http://api.local/jobs?search_term=rust%20dev&location=Paris&results_wanted=5";
        let fetcher = Arc::new(StaticFetcher::new().with_page(url, &api_body(8)));
        let source = source(fetcher.clone(), 20);

        let jobs = source.search(&SearchQuery::new("rust dev", "Paris", 5)).await.unwrap();
        assert_eq!(jobs.len(), 5);
        assert_eq!(fetcher.requested(), vec![url.to_string()]);
        // the API is called as JSON, not as a browser page
        assert_eq!(fetcher.json_requested(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_search_page_slices_results() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_page("http://api.local/jobs?search_term=rust&location=&results_wanted=4", &api_body(4))
                .with_page("http://api.local/jobs?search_term=rust&location=&results_wanted=6", &api_body(5)),
        );
        let source = source(fetcher, 2);
        let query = SearchQuery::new("rust", "", 10);

        let second = source.search_page(&query, 2).await.unwrap();
        assert_eq!(second.jobs.len(), 2);
        assert_eq!(second.jobs[0].title, "Job 2");
        assert!(second.has_next_page);

        let third = source.search_page(&query, 3).await.unwrap();
        assert_eq!(third.jobs.len(), 1);
        assert!(!third.has_next_page);
    }

    #[tokio::test]
    async fn test_api_errors_surface() {
        let source = source(Arc::new(StaticFetcher::new()), 20);
        let result = source.search(&SearchQuery::new("rust", "", 10)).await;
        assert!(matches!(result, Err(SourceError::Http { status: 404, .. })));
    }
}
