//! Tiered disclosure aggregation engine
//!
//! A query is validated, authenticated and checked against the client's daily
//! quota before the store is touched. Each matching record is then folded into
//! one aggregate under the visibility tier its case resolves to for the
//! requesting client.

pub mod accumulator;
pub mod coarsener;
pub mod guard;
pub mod orchestrator;
pub mod ports;
pub mod resolver;
pub mod tier;
pub mod validator;

pub use accumulator::{fold, AccumulationState, Aggregate};
pub use coarsener::{OntologyFallback, PhenotypeCoarsener, DEFAULT_COARSE_DEPTH};
pub use guard::{AccessDecision, AccessGuard};
pub use orchestrator::{Answer, EngineSettings, QueryEngine, QueryOutcome, Rejection};
pub use ports::{
    AuditSink, ClientDirectory, OntologyError, OntologyLookup, QuerySummary, StoreQuery,
    VariantStore,
};
pub use resolver::{resolve_tier, visible_projects};
pub use tier::VisibilityTier;
pub use validator::{validate, RawQuery, ValidatedQuery, ValidationError, MAX_POSITION};
