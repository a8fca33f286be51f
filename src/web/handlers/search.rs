//! Job search for signed-in users
//!
//! Results come from the aggregator; each listing is decorated with the
//! caller's saved and applied state, matched by listing URL.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregator::AggregatedResults;
use crate::errors::{AppError, AppResult};
use crate::models::{AnnotatedListing, Listing, SavedJob, SourceKind};
use crate::web::extractors::{AppPath, AuthUser, SearchParams};
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct AnnotatedJobs {
    pub all: Vec<AnnotatedListing>,
}

pub fn annotate(listing: Listing, saved: &HashMap<String, SavedJob>) -> AnnotatedListing {
    match saved.get(&listing.url) {
        Some(job) => AnnotatedListing {
            saved_state: job.saved_state,
            saved_date: job.saved_date,
            applied_state: job.applied_state,
            applied_date: job.applied_date,
            listing,
        },
        None => AnnotatedListing::unsaved(listing),
    }
}

pub async fn search_jobs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<AggregatedResults<AnnotatedListing>>> {
    let query = SearchParams::application(params)
        .application_query(state.config.aggregate.default_results, state.config.scraper.max_results)?;

    let saved = state.database.saved_states_by_url(user.id).await?;
    let results = state.aggregator.search_all(&query).await;

    Ok(Json(results.map(|listing| annotate(listing, &saved))))
}

pub async fn search_jobs_from_source(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(source): AppPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<AnnotatedJobs>> {
    let kind: SourceKind = source
        .parse()
        .map_err(|_| AppError::not_found("Source", source.as_str()))?;
    let query = SearchParams::application(params)
        .application_query(state.config.scraper.default_results(kind), state.config.scraper.max_results)?;

    let saved = state.database.saved_states_by_url(user.id).await?;
    let found = state.aggregator.search_one(kind, &query).await;

    Ok(Json(AnnotatedJobs {
        all: found.jobs.into_iter().map(|listing| annotate(listing, &saved)).collect(),
    }))
}
