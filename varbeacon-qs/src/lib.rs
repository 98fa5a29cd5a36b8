//! varbeacon-qs library - beacon query service
//!
//! Thin HTTP surface over the tiered disclosure engine: allele queries,
//! beacon info and health.

use anyhow::Context;
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};
use varbeacon_common::config::{BeaconConfig, BeaconMetadata, OntologyConfig};
use varbeacon_common::db::{
    init_database, SqliteAuditSink, SqliteClientDirectory, SqliteVariantStore,
};
use varbeacon_common::engine::{OntologyLookup, PhenotypeCoarsener, QueryEngine};
use varbeacon_common::ontology::{OboOntology, UnavailableOntology};

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    /// Beacon self-description echoed in every response
    pub beacon: Arc<BeaconMetadata>,
}

impl AppState {
    pub fn new(engine: QueryEngine, beacon: BeaconMetadata) -> Self {
        Self {
            engine: Arc::new(engine),
            beacon: Arc::new(beacon),
        }
    }
}

/// Load the configured ontology
///
/// Without an OBO file, or when it cannot be read, every coarsening lookup
/// degrades according to the configured failure policy.
pub fn load_ontology(config: &OntologyConfig) -> Arc<dyn OntologyLookup> {
    let Some(path) = &config.obo_path else {
        warn!("No ontology configured; coarse phenotypes fall back per policy");
        return Arc::new(UnavailableOntology);
    };
    match OboOntology::load(path) {
        Ok(ontology) => Arc::new(ontology),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load ontology; coarse phenotypes fall back per policy");
            Arc::new(UnavailableOntology)
        }
    }
}

/// Open the database and wire the engine to its SQLite adapters
pub async fn build_state(config: &BeaconConfig) -> anyhow::Result<AppState> {
    let pool = init_database(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    info!("Database: {}", config.database_path.display());

    let coarsener = PhenotypeCoarsener::new(
        load_ontology(&config.ontology),
        config.ontology.coarse_depth,
        config.ontology.on_failure,
    );
    let engine = QueryEngine::new(
        Arc::new(SqliteVariantStore::new(pool.clone())),
        Arc::new(SqliteClientDirectory::new(pool.clone())),
        Arc::new(SqliteAuditSink::new(pool)),
        coarsener,
        config.engine.clone(),
    );

    Ok(AppState::new(engine, config.beacon.clone()))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/", get(api::get_info))
        .route("/query", get(api::query_get).post(api::query_post))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
