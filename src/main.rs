//! osmate - chat assistant for OpenStreetMap edits
//!
//! Drives per-user edit conversations that create nodes, notes and GPX
//! traces, and browse Osmose quality issues near a location.

mod api;
mod commit;
mod config;
mod draft;
mod geo;
mod osm;
mod osmose;
mod pager;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use commit::OsmCommitGateway;
use config::Config;
use osm::OsmApi;
use osmose::{LoggingIssueService, OsmoseClient};
use runtime::{RuntimeManager, RuntimeSettings, ServiceIssueSource};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osmate=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Map editing
    let osm_api = OsmApi::new(&config.osm_url, config.osm_token.clone(), config.http_timeout)?;
    if osm_api.has_credentials() {
        tracing::info!(url = %config.osm_url, "Map API configured");
    } else {
        tracing::warn!(
            url = %config.osm_url,
            "No OSM token configured. Set OSMATE_OSM_TOKEN; saving will fail."
        );
    }

    // Issue search
    let osmose = OsmoseClient::new(&config.osmose_url, config.http_timeout)?;
    let issues = ServiceIssueSource::new(Arc::new(LoggingIssueService::new(Arc::new(osmose))))
        .with_element_lookup(osm_api.clone());
    tracing::info!(url = %config.osmose_url, "Issue service configured");

    let gateway = OsmCommitGateway::new(osm_api, config.changeset_comment.clone());

    let manager = RuntimeManager::new(issues, gateway, RuntimeSettings::from(&config));
    let state = AppState::new(manager);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("osmate server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
