//! Ports to the collaborators the engine does not own
//!
//! The persistent store, client directory, audit log and ontology graph are
//! reached only through these traits. SQLite implementations live in
//! [`crate::db`], the OBO-backed ontology in [`crate::ontology`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::{CaseId, Client, ClientId, ProjectId};
use crate::variant::{Chromosome, VariantMatch};
use crate::Result;

/// Exact-match lookup handed to the variant store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    pub chromosome: Chromosome,
    /// 1-based start position
    pub start: u64,
    pub end: u64,
    pub reference: String,
    pub alternative: String,
    pub assembly: String,
    /// Only cases of these projects may be returned
    pub allowed_projects: BTreeSet<ProjectId>,
}

/// Persistent store of variant calls and their cases
#[async_trait]
pub trait VariantStore: Send + Sync {
    /// All stored calls at exactly these coordinates, one per case
    async fn find(&self, query: &StoreQuery) -> Result<Vec<VariantMatch>>;
}

/// Static shared-secret lookup of remote sites
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Client owning this key, with its consortia and their projects
    async fn find_by_key(&self, key: &str) -> Result<Option<Client>>;
}

/// Record of one answered query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    pub request_id: Uuid,
    pub client_id: ClientId,
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
    /// Calendar day the query counts against
    pub day: NaiveDate,
    /// Normalized request, e.g. `GRCh37 1:12346-12346 C>T`
    pub request: String,
    pub exists: bool,
    pub touched_cases: Vec<CaseId>,
}

/// Audit log of answered queries, also the source of the daily quota count
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Answered queries already recorded for the client on `day`
    async fn count_today(&self, client: &Client, day: NaiveDate) -> Result<u32>;

    async fn record(&self, summary: &QuerySummary) -> Result<()>;
}

/// Failure of an ontology lookup
///
/// Never fails a query; the coarsener degrades and logs instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OntologyError {
    #[error("term {0} is not in the ontology")]
    UnknownTerm(String),

    #[error("ontology graph is malformed around {term}: {reason}")]
    Malformed { term: String, reason: String },

    #[error("no ontology is loaded")]
    Unavailable,
}

/// Read-only ancestor lookup over a phenotype ontology
pub trait OntologyLookup: Send + Sync {
    /// Ancestors of `term` lying exactly `depth` steps below the ontology root
    ///
    /// Empty when the term itself is at or above that depth.
    fn ancestors_at_depth(
        &self,
        term: &str,
        depth: usize,
    ) -> std::result::Result<BTreeSet<String>, OntologyError>;
}
