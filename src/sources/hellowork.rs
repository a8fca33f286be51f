//! HelloWork search result scraper
//!
//! Result pages list offers in `ul[aria-label="liste des offres"]`, roughly
//! twenty per page, with a "Page suivante" control while more pages exist.

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::extract::{absolutize, direct_text_nodes, first_attr, first_text, is_enabled, selector, text_of};
use super::{JobSource, PageFetcher};
use crate::config::HelloWorkConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::{Listing, ListingPage, SearchQuery, SourceKind};

const JOB_WEBSITE: &str = "HelloWork";

pub struct HelloWorkSource {
    fetcher: Arc<dyn PageFetcher>,
    config: HelloWorkConfig,
    page_delay: Duration,
}

impl HelloWorkSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: HelloWorkConfig, page_delay: Duration) -> Self {
        Self {
            fetcher,
            config,
            page_delay,
        }
    }

    /// Search URL for `page` (1-based)
    pub fn search_url(&self, query: &SearchQuery, page: u32) -> String {
        let mut url = format!(
            "{}?k={}",
            self.config.search_url,
            urlencoding::encode(&query.job_query)
        );
        if !query.location_query.is_empty() {
            url.push_str(&format!("&l={}", urlencoding::encode(&query.location_query)));
        }
        if page > 1 {
            url.push_str(&format!("&p={}", page));
        }
        url
    }
}

/// Extract the listings and next-page flag from a HelloWork result page
pub fn parse_results_page(html: &str, page_url: &str) -> SourceResult<(Vec<Listing>, bool)> {
    let base = Url::parse(page_url)
        .map_err(|e| SourceError::parse_error(JOB_WEBSITE, format!("bad page url {}: {}", page_url, e)))?;
    let document = Html::parse_document(html);

    let items = selector(r#"ul[aria-label="liste des offres"] li"#)?;
    let anchor = selector("a")?;
    let header_image = selector("header > img")?;
    let header_logo = selector("header div img")?;
    let any_image = selector("img")?;
    let location = selector(r#"div[data-cy="localisationCard"]"#)?;
    let post_date = selector("div.tw-typo-s.tw-text-grey")?;
    let next_page = selector(r#"button[aria-label="Page suivante"], a[aria-label="Page suivante"]"#)?;

    let jobs = document
        .select(&items)
        .map(|job| {
            let title_anchor = job.select(&anchor).next();
            let job_post_date = job
                .select(&post_date)
                .map(text_of)
                .find(|text| text.to_lowercase().starts_with("il y a"))
                .unwrap_or_default();

            Listing {
                title: title_anchor.map(text_of).unwrap_or_default(),
                url: title_anchor
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| absolutize(&base, href))
                    .unwrap_or_default(),
                image: absolutize(&base, &first_attr(job, &header_image, "src")),
                company_logo: absolutize(&base, &first_attr(job, &header_logo, "src")),
                company_name: first_attr(job, &any_image, "alt"),
                location: first_text(job, &location),
                job_post_date,
                job_type: direct_text_nodes(job).into_iter().nth(1),
                job_website: JOB_WEBSITE.to_string(),
                ..Default::default()
            }
        })
        .filter(|job| !job.title.is_empty())
        .collect();

    let has_next_page = document.select(&next_page).any(is_enabled);

    Ok((jobs, has_next_page))
}

#[async_trait]
impl JobSource for HelloWorkSource {
    fn kind(&self) -> SourceKind {
        SourceKind::HelloWork
    }

    fn page_size(&self) -> u32 {
        self.config.page_size
    }

    fn page_delay(&self) -> Duration {
        self.page_delay
    }

    async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<ListingPage> {
        let url = self.search_url(query, page);
        debug!(source = %self.kind(), page, "Searching with URL: {}", url);

        let html = self.fetcher.fetch(&url).await?;
        let (jobs, has_next_page) = parse_results_page(&html, &url)?;

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

    const RESULTS_PAGE: &str = r#"
        <html><body>
        <ul aria-label="liste des offres">
          <li>
            <header>
              <img src="/img/offer-1.jpg" alt="Acme Corp">
              <div><img src="https://cdn.hellowork.com/logos/acme.png" alt="Acme Corp logo"></div>
            </header>
            <a href="/fr-fr/emplois/1001.html">Développeur Rust H/F</a>
            CDI <span>·</span> Télétravail partiel
            <div data-cy="localisationCard"> Bordeaux - 33 </div>
            <div class="tw-typo-s tw-text-grey">Salaire non communiqué</div>
            <div class="tw-typo-s tw-text-grey">Il y a 3 jours</div>
          </li>
          <li>
            <header><img src="/img/offer-2.jpg" alt="Globex"></header>
            <a href="https://www.hellowork.com/fr-fr/emplois/1002.html"> Ingénieur   DevOps </a>
            <div data-cy="localisationCard">Paris</div>
          </li>
          <li><span>Publicité</span></li>
        </ul>
        <nav><button aria-label="Page suivante">Suivant</button></nav>
        </body></html>
    "#;

    const LAST_PAGE: &str = r#"
        <ul aria-label="liste des offres">
          <li><a href="/fr-fr/emplois/2001.html">Data engineer</a></li>
        </ul>
        <button aria-label="Page suivante" disabled>Suivant</button>
    "#;

    fn source(fetcher: StaticFetcher) -> HelloWorkSource {
        HelloWorkSource::new(Arc::new(fetcher), HelloWorkConfig::default(), Duration::ZERO)
    }

    #[test]
    fn test_parse_results_page() {
        let page_url = "https://www.hellowork.com/fr-fr/emploi/recherche.html?k=rust";
        let (jobs, has_next) = parse_results_page(RESULTS_PAGE, page_url).unwrap();

        assert!(has_next);
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.title, "Développeur Rust H/F");
        assert_eq!(first.url, "https://www.hellowork.com/fr-fr/emplois/1001.html");
        assert_eq!(first.image, "https://www.hellowork.com/img/offer-1.jpg");
        assert_eq!(first.company_logo, "https://cdn.hellowork.com/logos/acme.png");
        assert_eq!(first.company_name, "Acme Corp");
        assert_eq!(first.location, "Bordeaux - 33");
        assert_eq!(first.job_post_date, "Il y a 3 jours");
        assert_eq!(first.job_type.as_deref(), Some("Télétravail partiel"));
        assert_eq!(first.job_website, "HelloWork");

        let second = &jobs[1];
        assert_eq!(second.title, "Ingénieur DevOps");
        assert_eq!(second.company_logo, "");
        assert_eq!(second.job_post_date, "");
    }

    #[test]
    fn test_disabled_next_button_ends_pagination() {
        let (jobs, has_next) =
            parse_results_page(LAST_PAGE, "https://www.hellowork.com/fr-fr/emploi/recherche.html").unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(!has_next);
    }

    #[test]
    fn test_search_url() {
        let source = source(StaticFetcher::new());
        let query = SearchQuery::new("développeur web", "Pau", 60);
        assert_eq!(
            source.search_url(&query, 1),
            "https://www.hellowork.com/fr-fr/emploi/recherche.html?k=d%C3%A9veloppeur%20web&l=Pau"
        );
        assert!(source.search_url(&query, 3).ends_with("&p=3"));

        let no_location = SearchQuery::new("rust", "", 60);
        assert!(!source.search_url(&no_location, 1).contains("&l="));
    }

    #[tokio::test]
    async fn test_search_walks_pages() {
        let base = "https://www.hellowork.com/fr-fr/emploi/recherche.html?k=rust";
        let fetcher = StaticFetcher::new()
            .with_page(base, RESULTS_PAGE)
            .with_page(&format!("{}&p=2", base), LAST_PAGE);
        let source = source(fetcher);

        let jobs = source.search(&SearchQuery::new("rust", "", 60)).await.unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].title, "Data engineer");
    }

    #[tokio::test]
    async fn test_search_page_propagates_fetch_errors() {
        let source = source(StaticFetcher::new());
        let result = source.search(&SearchQuery::new("rust", "", 20)).await;
        assert!(matches!(result, Err(SourceError::Http { status: 404, .. })));
    }
}
