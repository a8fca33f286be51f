use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod saved_job;
pub mod user;

pub use saved_job::*;
pub use user::*;

/// A normalized job posting as returned by every source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub job_post_date: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    pub url: String,
    pub image: String,
    pub company_logo: String,
    pub job_website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
}

/// Job boards the aggregator knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "helloWork")]
    HelloWork,
    #[serde(rename = "wttj")]
    WelcomeToTheJungle,
    #[serde(rename = "indeed")]
    Indeed,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::HelloWork,
        SourceKind::WelcomeToTheJungle,
        SourceKind::Indeed,
    ];

    /// Key used in aggregated payloads
    pub fn key(&self) -> &'static str {
        match self {
            SourceKind::HelloWork => "helloWork",
            SourceKind::WelcomeToTheJungle => "wttj",
            SourceKind::Indeed => "indeed",
        }
    }

    /// Path segment used by the HTTP routes
    pub fn slug(&self) -> &'static str {
        match self {
            SourceKind::HelloWork => "hellowork",
            SourceKind::WelcomeToTheJungle => "wttj",
            SourceKind::Indeed => "indeed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::HelloWork => "HelloWork",
            SourceKind::WelcomeToTheJungle => "Welcome to the Jungle",
            SourceKind::Indeed => "Indeed",
        }
    }

    pub fn domain(&self) -> &'static str {
        match self {
            SourceKind::HelloWork => "hellowork.com",
            SourceKind::WelcomeToTheJungle => "welcometothejungle.com",
            SourceKind::Indeed => "indeed.com",
        }
    }

    pub fn unavailable_message(&self) -> String {
        format!("{} temporarily unavailable", self.display_name())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hellowork" => Ok(SourceKind::HelloWork),
            "wttj" | "welcometothejungle" => Ok(SourceKind::WelcomeToTheJungle),
            "indeed" => Ok(SourceKind::Indeed),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// Describes a source for discovery endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub key: &'static str,
    pub slug: &'static str,
    pub display_name: &'static str,
    pub domain: &'static str,
}

impl From<SourceKind> for SourceDescriptor {
    fn from(kind: SourceKind) -> Self {
        Self {
            key: kind.key(),
            slug: kind.slug(),
            display_name: kind.display_name(),
            domain: kind.domain(),
        }
    }
}

/// Parameters shared by every source for a single search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub job_query: String,
    pub location_query: String,
    pub results_wanted: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
}

impl SearchQuery {
    pub fn new(job_query: impl Into<String>, location_query: impl Into<String>, results_wanted: u32) -> Self {
        Self {
            job_query: job_query.into(),
            location_query: location_query.into(),
            results_wanted,
            custom_url: None,
        }
    }

    pub fn with_custom_url(mut self, url: Option<String>) -> Self {
        self.custom_url = url.filter(|u| !u.trim().is_empty());
        self
    }
}

/// One page of listings from a paginated source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub page: u32,
    pub jobs: Vec<Listing>,
    pub has_next_page: bool,
}

/// Pagination metadata for a query against one source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub source: SourceKind,
    pub page_size: u32,
    pub first_page_count: usize,
    pub has_next_page: bool,
    pub estimated_pages: Option<u32>,
}

/// A listing decorated with the caller's saved/applied state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub saved_state: Option<SavedState>,
    pub saved_date: Option<DateTime<Utc>>,
    pub applied_state: Option<AppliedState>,
    pub applied_date: Option<DateTime<Utc>>,
}

impl AnnotatedListing {
    pub fn unsaved(listing: Listing) -> Self {
        Self {
            listing,
            saved_state: None,
            saved_date: None,
            applied_state: None,
            applied_date: None,
        }
    }
}
