//! Daily access quota per remote site
//!
//! The count of answered queries comes from the audit log, and a query is only
//! recorded once it has been answered. Check and record are two separate
//! round trips: near-simultaneous requests from the same client can both see
//! a count below the limit and both be admitted. Enforcing the limit strictly
//! needs an atomic increment in the audit store.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

use super::ports::{AuditSink, QuerySummary};
use crate::models::Client;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow { used: u32, limit: u32 },
    Deny { used: u32, limit: u32 },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow { .. })
    }
}

pub struct AccessGuard {
    audit: Arc<dyn AuditSink>,
}

impl AccessGuard {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    /// Decide whether `client` may issue another query on `today`
    ///
    /// Denies once the answered queries of the day reach `access_limit`. The
    /// slot is consumed when the answer is recorded through [`Self::record`].
    pub async fn check_and_consume(&self, client: &Client, today: NaiveDate) -> Result<AccessDecision> {
        let used = self.audit.count_today(client, today).await?;
        let limit = client.access_limit;

        if used >= limit {
            warn!(client = %client.name, used, limit, "Daily access limit reached");
            return Ok(AccessDecision::Deny { used, limit });
        }

        debug!(client = %client.name, used, limit, "Access granted");
        Ok(AccessDecision::Allow { used, limit })
    }

    /// Log an answered query; it counts against the client's quota from now on
    pub async fn record(&self, summary: &QuerySummary) -> Result<()> {
        self.audit.record(summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MemoryAudit {
        entries: Mutex<Vec<QuerySummary>>,
    }

    #[async_trait]
    impl AuditSink for MemoryAudit {
        async fn count_today(&self, client: &Client, day: NaiveDate) -> Result<u32> {
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .iter()
                .filter(|e| e.client_id == client.id && e.day == day)
                .count() as u32)
        }

        async fn record(&self, summary: &QuerySummary) -> Result<()> {
            self.entries.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    fn client(access_limit: u32) -> Client {
        Client {
            id: 1,
            name: "site-a".to_string(),
            key: "secret".to_string(),
            access_limit,
            consortia: vec![],
        }
    }

    fn summary(client: &Client, day: NaiveDate) -> QuerySummary {
        QuerySummary {
            request_id: Uuid::new_v4(),
            client_id: client.id,
            client_name: client.name.clone(),
            timestamp: Utc::now(),
            day,
            request: "GRCh37 1:101-101 A>C".to_string(),
            exists: false,
            touched_cases: vec![],
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_zero_limit_denies_first_query() {
        let guard = AccessGuard::new(Arc::new(MemoryAudit::default()));
        let decision = guard.check_and_consume(&client(0), day(1)).await.unwrap();
        assert_eq!(decision, AccessDecision::Deny { used: 0, limit: 0 });
    }

    #[tokio::test]
    async fn test_denies_at_limit() {
        let guard = AccessGuard::new(Arc::new(MemoryAudit::default()));
        let client = client(2);

        for used in 0..2 {
            let decision = guard.check_and_consume(&client, day(1)).await.unwrap();
            assert_eq!(decision, AccessDecision::Allow { used, limit: 2 });
            guard.record(&summary(&client, day(1))).await.unwrap();
        }

        let decision = guard.check_and_consume(&client, day(1)).await.unwrap();
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn test_quota_resets_next_day() {
        let guard = AccessGuard::new(Arc::new(MemoryAudit::default()));
        let client = client(1);
        guard.record(&summary(&client, day(1))).await.unwrap();

        assert!(!guard.check_and_consume(&client, day(1)).await.unwrap().is_allowed());
        assert!(guard.check_and_consume(&client, day(2)).await.unwrap().is_allowed());
    }
}
