//! End-to-end evaluation of one allele query

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::accumulator::{fold, AccumulationState, Aggregate};
use super::coarsener::PhenotypeCoarsener;
use super::guard::{AccessDecision, AccessGuard};
use super::ports::{AuditSink, ClientDirectory, QuerySummary, StoreQuery, VariantStore};
use super::resolver::{resolve_tier, visible_projects};
use super::validator::{validate, RawQuery, ValidatedQuery, ValidationError};
use crate::models::CaseId;
use crate::{time, Result};

fn default_assembly() -> String {
    "GRCh37".to_string()
}

fn default_public_key() -> String {
    "public".to_string()
}

/// Request defaults applied by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Assembly used when the request names none
    #[serde(default = "default_assembly")]
    pub default_assembly: String,
    /// Key used for requests that carry no client key
    #[serde(default = "default_public_key")]
    pub public_key: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_assembly: default_assembly(),
            public_key: default_public_key(),
        }
    }
}

/// Why a query was refused; no case data was touched
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("unknown client key")]
    Unauthenticated,

    #[error("daily access limit reached ({used}/{limit})")]
    QuotaExceeded { used: u32, limit: u32 },
}

/// An answered query
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub request_id: Uuid,
    pub client_name: String,
    pub query: ValidatedQuery,
    pub assembly: String,
    pub aggregate: Aggregate,
    /// Every visible case that contributed, for audit logging
    pub touched_cases: Vec<CaseId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rejected(Rejection),
    Answered(Answer),
}

/// Normalized request text as written to the audit log, with the 1-based start
fn describe(query: &ValidatedQuery, assembly: &str) -> String {
    format!(
        "{} {}:{}-{} {}>{}",
        assembly,
        query.chromosome,
        query.one_based_start(),
        query.end,
        query.reference,
        query.alternate
    )
}

pub struct QueryEngine {
    store: Arc<dyn VariantStore>,
    clients: Arc<dyn ClientDirectory>,
    guard: AccessGuard,
    coarsener: PhenotypeCoarsener,
    settings: EngineSettings,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn VariantStore>,
        clients: Arc<dyn ClientDirectory>,
        audit: Arc<dyn AuditSink>,
        coarsener: PhenotypeCoarsener,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            clients,
            guard: AccessGuard::new(audit),
            coarsener,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Evaluate a query against today's quota
    ///
    /// `client_key` falls back to the public key. Rejections are returned as
    /// [`QueryOutcome::Rejected`]; `Err` means a port failed.
    pub async fn evaluate(&self, raw: &RawQuery, client_key: Option<&str>) -> Result<QueryOutcome> {
        self.evaluate_on(raw, client_key, time::today()).await
    }

    pub async fn evaluate_on(
        &self,
        raw: &RawQuery,
        client_key: Option<&str>,
        today: NaiveDate,
    ) -> Result<QueryOutcome> {
        let query = match validate(raw) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "Rejected malformed query");
                return Ok(QueryOutcome::Rejected(e.into()));
            }
        };

        let key = client_key.unwrap_or(&self.settings.public_key);
        let Some(client) = self.clients.find_by_key(key).await? else {
            warn!("Rejected query with unknown client key");
            return Ok(QueryOutcome::Rejected(Rejection::Unauthenticated));
        };

        if let AccessDecision::Deny { used, limit } =
            self.guard.check_and_consume(&client, today).await?
        {
            return Ok(QueryOutcome::Rejected(Rejection::QuotaExceeded { used, limit }));
        }

        let assembly = raw
            .assembly
            .as_deref()
            .filter(|assembly| !assembly.is_empty())
            .unwrap_or(&self.settings.default_assembly)
            .to_string();

        let store_query = StoreQuery {
            chromosome: query.chromosome,
            start: query.one_based_start(),
            end: query.end,
            reference: query.reference.clone(),
            alternative: query.alternate.clone(),
            assembly: assembly.clone(),
            allowed_projects: visible_projects(&client.consortia),
        };
        let records = self.store.find(&store_query).await?;

        let state = records
            .iter()
            .fold(AccumulationState::default(), |state, record| {
                match resolve_tier(record.case.project_id, &client.consortia) {
                    Some(tier) => fold(state, record, tier, &self.coarsener),
                    None => state,
                }
            });
        let (aggregate, touched_cases) = state.finish();

        let summary = QuerySummary {
            request_id: Uuid::new_v4(),
            client_id: client.id,
            client_name: client.name.clone(),
            timestamp: time::now(),
            day: today,
            request: describe(&query, &assembly),
            exists: aggregate.exists,
            touched_cases: touched_cases.clone(),
        };
        self.guard.record(&summary).await?;

        info!(
            client = %client.name,
            request = %summary.request,
            exists = aggregate.exists,
            matches = records.len(),
            touched_cases = touched_cases.len(),
            "Answered allele query"
        );

        Ok(QueryOutcome::Answered(Answer {
            request_id: summary.request_id,
            client_name: client.name,
            query,
            assembly,
            aggregate,
            touched_cases,
        }))
    }
}
