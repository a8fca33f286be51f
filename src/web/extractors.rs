//! Request extractors and validation
//!
//! Bearer token authentication, the query parameters shared by the
//! search endpoints, and JSON/path extractors whose rejections use the
//! application's error body.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::collections::HashMap;
use tracing::debug;

use super::AppState;
use crate::errors::AppError;
use crate::models::{SearchQuery, User};

/// `Json` that rejects malformed bodies with a 400 `{"error": ...}`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Path` that rejects unparsable segments with a 400 `{"error": ...}`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// The user owning the bearer token of the request
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?;

        match state.database.authenticate_token(token).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                debug!("Rejected unknown bearer token");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Raw search parameters
///
/// Collected from a loose map so that a malformed `resultsWanted` falls
/// back to the default instead of rejecting the request.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub job_query: Option<String>,
    pub location_query: Option<String>,
    pub results_wanted: Option<u32>,
    pub url: Option<String>,
}

impl SearchParams {
    fn from_map(mut params: HashMap<String, String>, job_key: &str, location_key: &str) -> Self {
        Self {
            job_query: params.remove(job_key).map(|v| v.trim().to_string()),
            location_query: params.remove(location_key).map(|v| v.trim().to_string()),
            results_wanted: params
                .remove("resultsWanted")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n > 0),
            url: params.remove("url"),
        }
    }

    /// Parameters of the scraper endpoints (`jobQuery`, `locationQuery`)
    pub fn scraper(params: HashMap<String, String>) -> Self {
        Self::from_map(params, "jobQuery", "locationQuery")
    }

    /// Parameters of the application search endpoints (`job`, `location`)
    pub fn application(params: HashMap<String, String>) -> Self {
        Self::from_map(params, "job", "location")
    }

    pub fn results_or(&self, default: u32, max: u32) -> u32 {
        self.results_wanted.unwrap_or(default).min(max.max(1))
    }

    /// Build the query for a scraper endpoint; only the job query is required
    pub fn scraper_query(&self, default: u32, max: u32) -> Result<SearchQuery, AppError> {
        let job = self
            .job_query
            .clone()
            .filter(|j| !j.is_empty())
            .ok_or_else(|| AppError::validation("jobQuery is required"))?;

        Ok(SearchQuery::new(job, self.location_query.clone().unwrap_or_default(), self.results_or(default, max))
            .with_custom_url(self.url.clone()))
    }

    /// Build the query for an application search; job and location are required
    pub fn application_query(&self, default: u32, max: u32) -> Result<SearchQuery, AppError> {
        match (
            self.job_query.clone().filter(|j| !j.is_empty()),
            self.location_query.clone().filter(|l| !l.is_empty()),
        ) {
            (Some(job), Some(location)) => Ok(SearchQuery::new(job, location, self.results_or(default, max))),
            _ => Err(AppError::validation("Missing required parameters")),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SearchParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(Self::scraper(params))
    }
}
