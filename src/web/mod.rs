//! Web layer module
//!
//! HTTP interface of the job aggregator. Scraper endpoints are public;
//! saved job and account endpoints require a bearer token.

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{
    aggregator::{Aggregator, ScrapeStateManager},
    config::Config,
    database::Database,
};

pub mod extractors;
pub mod handlers;

pub use extractors::{AuthUser, SearchParams};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(
        config: Config,
        database: Database,
        aggregator: Aggregator,
        state_manager: ScrapeStateManager,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;

        let app = Self::create_router(AppState {
            database,
            config,
            aggregator,
            state_manager,
        });

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        let cors = Self::cors_layer(&state.config.web.cors_origins);

        Router::new()
            .route("/api/health", get(handlers::health_check))
            // Scrapers
            .route("/api/sources", get(handlers::scrape::list_sources))
            .route("/api/sources/status", get(handlers::scrape::sources_status))
            .route("/api/all", get(handlers::scrape::search_all))
            .route("/api/:source", get(handlers::scrape::search_source))
            .route("/api/:source/page/:page", get(handlers::scrape::search_page))
            .route("/api/:source/info", get(handlers::scrape::pagination_info))
            // Saved jobs
            .route(
                "/api/jobs",
                get(handlers::jobs::list_jobs).post(handlers::jobs::create_job),
            )
            .route("/api/jobs/search", get(handlers::search::search_jobs))
            .route(
                "/api/jobs/search/:source",
                get(handlers::search::search_jobs_from_source),
            )
            .route(
                "/api/jobs/:id",
                axum::routing::patch(handlers::jobs::update_job).delete(handlers::jobs::delete_job),
            )
            .route(
                "/api/jobs/:id/notes",
                get(handlers::jobs::get_notes)
                    .put(handlers::jobs::update_notes)
                    .delete(handlers::jobs::delete_notes),
            )
            // Account
            .route(
                "/api/user",
                get(handlers::user::get_user)
                    .put(handlers::user::update_user)
                    .delete(handlers::user::delete_user),
            )
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    fn cors_layer(origins: &[String]) -> CorsLayer {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub aggregator: Aggregator,
    pub state_manager: ScrapeStateManager,
}
