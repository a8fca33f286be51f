//! Welcome to the Jungle search result scraper
//!
//! Result pages are addressed by a `page=N` query parameter. Callers may pass
//! their own search URL (for refinements the query form does not expose); it
//! is paginated the same way when it carries a page parameter. Custom URLs
//! must point at the configured site, anything else is ignored.

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::extract::{absolutize, first_attr, first_text, selector};
use super::{JobSource, PageFetcher};
use crate::config::WttjConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::{Listing, ListingPage, SearchQuery, SourceKind};

const JOB_WEBSITE: &str = "Welcome to the Jungle";

pub struct WttjSource {
    fetcher: Arc<dyn PageFetcher>,
    config: WttjConfig,
    page_delay: Duration,
    page_param: Regex,
    site_domain: String,
}

impl WttjSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: WttjConfig, page_delay: Duration) -> SourceResult<Self> {
        let page_param = Regex::new(r"([?&])page=\d+")
            .map_err(|e| SourceError::invalid_config("page_param", e.to_string()))?;
        let site_domain = Url::parse(&config.search_url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.trim_start_matches("www.").to_string()))
            .ok_or_else(|| SourceError::invalid_config("wttj.search_url", config.search_url.clone()))?;
        Ok(Self {
            fetcher,
            config,
            page_delay,
            page_param,
            site_domain,
        })
    }

    /// Whether `url` is an http(s) URL on the configured site or one of its subdomains
    pub fn is_allowed_custom_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        match parsed.host_str() {
            Some(host) => host == self.site_domain || host.ends_with(&format!(".{}", self.site_domain)),
            None => false,
        }
    }

    /// First result page URL, either the caller's or one built from the query
    pub fn first_page_url(&self, query: &SearchQuery) -> String {
        if let Some(custom) = &query.custom_url {
            if self.is_allowed_custom_url(custom) {
                return custom.clone();
            }
            warn!(source = %self.kind(), "Ignoring custom URL outside {}: {}", self.site_domain, custom);
        }

        let mut url = format!(
            "{}?query={}&page=1",
            self.config.search_url,
            urlencoding::encode(&query.job_query)
        );
        if !query.location_query.is_empty() {
            url.push_str(&format!(
                "&aroundQuery={}",
                urlencoding::encode(&query.location_query)
            ));
        }
        url.push_str(&format!(
            "&refinementList%5Boffices.country_code%5D%5B%5D={}&aroundLatLng={}&aroundRadius={}",
            urlencoding::encode(&self.config.country_code),
            urlencoding::encode(&self.config.around_lat_lng),
            self.config.around_radius
        ));
        url
    }

    /// URL of `page`, or `None` when the URL cannot be paginated
    pub fn page_url(&self, first_page: &str, page: u32) -> Option<String> {
        if self.page_param.is_match(first_page) {
            Some(
                self.page_param
                    .replace(first_page, format!("${{1}}page={}", page).as_str())
                    .into_owned(),
            )
        } else if page == 1 {
            Some(first_page.to_string())
        } else {
            None
        }
    }
}

/// Extract the listings from a Welcome to the Jungle result page
pub fn parse_results_page(html: &str, page_url: &str) -> SourceResult<Vec<Listing>> {
    let base = Url::parse(page_url)
        .map_err(|e| SourceError::parse_error(JOB_WEBSITE, format!("bad page url {}: {}", page_url, e)))?;
    let document = Html::parse_document(html);

    let items = selector(r#"li[data-testid="search-results-list-item-wrapper"]"#)?;
    let anchor = selector("a")?;
    let anchor_image = selector("a img")?;
    let logo = selector("div > img")?;
    let title = selector("h4")?;
    let company = selector("span.wui-text")?;
    let location = selector("p.wui-text")?;
    let post_date = selector("time[datetime] > span")?;

    let jobs = document
        .select(&items)
        .map(|job| Listing {
            title: first_text(job, &title),
            company_name: first_text(job, &company),
            location: first_text(job, &location),
            job_post_date: first_text(job, &post_date),
            url: absolutize(&base, &first_attr(job, &anchor, "href")),
            image: absolutize(&base, &first_attr(job, &anchor_image, "src")),
            company_logo: absolutize(&base, &first_attr(job, &logo, "src")),
            job_website: JOB_WEBSITE.to_string(),
            ..Default::default()
        })
        .filter(|job| !job.title.is_empty())
        .collect();

    Ok(jobs)
}

#[async_trait]
impl JobSource for WttjSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WelcomeToTheJungle
    }

    fn page_size(&self) -> u32 {
        self.config.page_size
    }

    fn page_delay(&self) -> Duration {
        self.page_delay
    }

    async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<ListingPage> {
        let first_page = self.first_page_url(query);
        let Some(url) = self.page_url(&first_page, page) else {
            debug!(source = %self.kind(), page, "URL has no page parameter, no more pages");
            return Ok(ListingPage {
                page,
                jobs: Vec::new(),
                has_next_page: false,
            });
        };
        debug!(source = %self.kind(), page, "Searching with URL: {}", url);

        let html = self.fetcher.fetch(&url).await?;
        let jobs = parse_results_page(&html, &url)?;
        let has_next_page = jobs.len() >= self.config.page_size as usize
            && self.page_url(&first_page, page + 1).is_some();

        Ok(ListingPage {
            page,
            jobs,
            has_next_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::fetcher::testing::StaticFetcher;

    fn card(n: usize) -> String {
        format!(
            r#"<li data-testid="search-results-list-item-wrapper">
                 <div><img src="/logos/{n}.png"></div>
                 <a href="/fr/companies/acme/jobs/offer-{n}"><img src="https://cdn.wttj.co/cover-{n}.jpg"></a>
                 <h4>Backend engineer {n}</h4>
                 <span class="wui-text">Acme</span>
                 <p class="wui-text">Bordeaux</p>
                 <time datetime="2025-01-01T00:00:00Z"><span>il y a 2 jours</span></time>
               </li>"#
        )
    }

    fn page_of(cards: std::ops::Range<usize>) -> String {
        format!("<ul>{}</ul>", cards.map(card).collect::<String>())
    }

    fn config(page_size: u32) -> WttjConfig {
        WttjConfig {
            page_size,
            ..WttjConfig::default()
        }
    }

    #[test]
    fn test_parse_results_page() {
        let html = format!("{}<li data-testid=\"search-results-list-item-wrapper\"><a href=\"/x\"></a></li>", page_of(0..1));
        let jobs = parse_results_page(&html, "https://www.welcometothejungle.com/fr/jobs?query=rust&page=1").unwrap();

        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "Backend engineer 0");
        assert_eq!(job.company_name, "Acme");
        assert_eq!(job.location, "Bordeaux");
        assert_eq!(job.job_post_date, "il y a 2 jours");
        assert_eq!(job.url, "https://www.welcometothejungle.com/fr/companies/acme/jobs/offer-0");
        assert_eq!(job.image, "https://cdn.wttj.co/cover-0.jpg");
        assert_eq!(job.company_logo, "https://www.welcometothejungle.com/logos/0.png");
        assert_eq!(job.job_website, "Welcome to the Jungle");
    }

    #[test]
    fn test_first_page_url() {
        let source = WttjSource::new(Arc::new(StaticFetcher::new()), config(20), Duration::ZERO).unwrap();

        let url = source.first_page_url(&SearchQuery::new("data engineer", "Bordeaux", 30));
        assert_eq!(
            url,
            "https://www.welcometothejungle.com/fr/jobs?query=data%20engineer&page=1&aroundQuery=Bordeaux\
             &refinementList%5Boffices.country_code%5D%5B%5D=FR&aroundLatLng=44.84044%2C-0.5805&aroundRadius=20"
        );

        let custom = SearchQuery::new("ignored", "", 30)
            .with_custom_url(Some("https://www.welcometothejungle.com/fr/jobs?query=go&page=1".to_string()));
        assert_eq!(source.first_page_url(&custom), "https://www.welcometothejungle.com/fr/jobs?query=go&page=1");
    }

    #[test]
    fn test_custom_url_restricted_to_site() {
        let source = WttjSource::new(Arc::new(StaticFetcher::new()), config(20), Duration::ZERO).unwrap();

        assert!(source.is_allowed_custom_url("https://welcometothejungle.com/fr/jobs?page=1"));
        assert!(source.is_allowed_custom_url("http://api.welcometothejungle.com/jobs"));
        assert!(!source.is_allowed_custom_url("http://127.0.0.1:8080/admin/secret?page=1"));
        assert!(!source.is_allowed_custom_url("https://welcometothejungle.com.evil.test/jobs"));
        assert!(!source.is_allowed_custom_url("https://notwelcometothejungle.com/jobs"));
        assert!(!source.is_allowed_custom_url("file:///etc/passwd"));
        assert!(!source.is_allowed_custom_url("not a url"));

        let internal = SearchQuery::new("rust", "", 30)
            .with_custom_url(Some("http://127.0.0.1:8080/admin/secret?page=1".to_string()));
        let url = source.first_page_url(&internal);
        assert!(url.starts_with("https://www.welcometothejungle.com/fr/jobs?query=rust&page=1"));
    }

    #[tokio::test]
    async fn test_search_never_fetches_foreign_custom_url() {
        let fetcher = Arc::new(StaticFetcher::new());
        let source = WttjSource::new(fetcher.clone(), config(20), Duration::ZERO).unwrap();

        let query = SearchQuery::new("rust", "", 10)
            .with_custom_url(Some("http://169.254.169.254/latest/meta-data?page=1".to_string()));
        let _ = source.search(&query).await;

        let requested = fetcher.requested();
        assert!(!requested.is_empty());
        assert!(requested.iter().all(|url| url.starts_with("https://www.welcometothejungle.com/")));
    }

    #[test]
    fn test_page_url() {
        let source = WttjSource::new(Arc::new(StaticFetcher::new()), config(20), Duration::ZERO).unwrap();

        assert_eq!(
            source.page_url("https://x/jobs?query=a&page=1&aroundRadius=20", 3).as_deref(),
            Some("https://x/jobs?query=a&page=3&aroundRadius=20")
        );
        assert_eq!(
            source.page_url("https://x/jobs?page=1", 2).as_deref(),
            Some("https://x/jobs?page=2")
        );
        assert_eq!(source.page_url("https://x/jobs?query=a", 1).as_deref(), Some("https://x/jobs?query=a"));
        assert_eq!(source.page_url("https://x/jobs?query=a", 2), None);
    }

    #[tokio::test]
    async fn test_search_paginates_by_page_parameter() {
        let first = "https://www.welcometothejungle.com/fr/jobs?query=rust&page=1";
        let fetcher = StaticFetcher::new()
            .with_page(first, &page_of(0..2))
            .with_page("https://www.welcometothejungle.com/fr/jobs?query=rust&page=2", &page_of(2..3));
        let fetcher = Arc::new(fetcher);
        let source = WttjSource::new(fetcher.clone(), config(2), Duration::ZERO).unwrap();

        let query = SearchQuery::new("rust", "", 10).with_custom_url(Some(first.to_string()));
        let jobs = source.search(&query).await.unwrap();

        assert_eq!(jobs.len(), 3);
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_url_without_page_parameter_is_single_page() {
        let first = "https://www.welcometothejungle.com/fr/jobs?query=rust";
        let fetcher = Arc::new(StaticFetcher::new().with_page(first, &page_of(0..2)));
        let source = WttjSource::new(fetcher.clone(), config(2), Duration::ZERO).unwrap();

        let query = SearchQuery::new("rust", "", 10).with_custom_url(Some(first.to_string()));
        let jobs = source.search(&query).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(fetcher.requested(), vec![first.to_string()]);
    }
}
