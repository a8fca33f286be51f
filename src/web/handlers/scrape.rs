//! Scraper endpoints
//!
//! Unauthenticated access to the individual job boards and to the
//! aggregated search. Single-source searches never fail the request: a board
//! that cannot be reached yields an empty result carrying an `error`.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::aggregator::{AggregatedResults, SourceJobs, SourceRunStatus};
use crate::errors::{AppError, AppResult};
use crate::models::{Listing, PaginationInfo, SourceDescriptor, SourceKind};
use crate::web::extractors::{AppPath, SearchParams};
use crate::web::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub has_next_page: bool,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub count: usize,
    pub jobs: Vec<Listing>,
    pub pagination: PageMeta,
}

fn parse_source(source: &str) -> AppResult<SourceKind> {
    source
        .parse()
        .map_err(|_| AppError::not_found("Source", source))
}

pub async fn search_source(
    State(state): State<AppState>,
    AppPath(source): AppPath<String>,
    params: SearchParams,
) -> AppResult<Json<SourceJobs>> {
    let kind = parse_source(&source)?;
    let scraper = &state.config.scraper;
    let query = params.scraper_query(scraper.default_results(kind), scraper.max_results)?;

    info!(
        source = %kind,
        "Search request: job='{}' location='{}' results={}",
        query.job_query, query.location_query, query.results_wanted
    );

    Ok(Json(state.aggregator.search_one(kind, &query).await))
}

pub async fn search_all(State(state): State<AppState>, params: SearchParams) -> AppResult<Json<AggregatedResults>> {
    let query = params.scraper_query(state.config.aggregate.default_results, state.config.scraper.max_results)?;
    Ok(Json(state.aggregator.search_all(&query).await))
}

pub async fn search_page(
    State(state): State<AppState>,
    AppPath((source, page)): AppPath<(String, u32)>,
    params: SearchParams,
) -> AppResult<Json<PageResponse>> {
    let kind = parse_source(&source)?;
    if page == 0 {
        return Err(AppError::validation("page must be 1 or greater"));
    }

    let scraper = &state.config.scraper;
    let query = params.scraper_query(scraper.default_results(kind), scraper.max_results)?;
    let result = state.aggregator.search_page(kind, &query, page).await?;

    Ok(Json(PageResponse {
        count: result.jobs.len(),
        jobs: result.jobs,
        pagination: PageMeta {
            page: result.page,
            has_next_page: result.has_next_page,
        },
    }))
}

pub async fn pagination_info(
    State(state): State<AppState>,
    AppPath(source): AppPath<String>,
    params: SearchParams,
) -> AppResult<Json<PaginationInfo>> {
    let kind = parse_source(&source)?;
    let scraper = &state.config.scraper;
    let query = params.scraper_query(scraper.default_results(kind), scraper.max_results)?;

    Ok(Json(state.aggregator.pagination_info(kind, &query).await?))
}

pub async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceDescriptor>> {
    Json(
        state
            .aggregator
            .registry()
            .kinds()
            .into_iter()
            .map(SourceDescriptor::from)
            .collect(),
    )
}

pub async fn sources_status(State(state): State<AppState>) -> Json<Vec<SourceRunStatus>> {
    Json(state.state_manager.get_all_status().await)
}
