//! SQLite audit log of answered queries

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::engine::ports::{AuditSink, QuerySummary};
use crate::models::Client;
use crate::Result;

pub struct SqliteAuditSink {
    pool: SqlitePool,
}

impl SqliteAuditSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn count_today(&self, client: &Client, day: NaiveDate) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM audit_log WHERE remote_site_id = ? AND day = ?",
        )
        .bind(client.id)
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record(&self, summary: &QuerySummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log
                (request_id, remote_site_id, remote_site_name, request, variant_exists,
                 touched_cases, day, date_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.request_id.to_string())
        .bind(summary.client_id)
        .bind(&summary.client_name)
        .bind(&summary.request)
        .bind(summary.exists)
        .bind(serde_json::to_string(&summary.touched_cases)?)
        .bind(summary.day.format("%Y-%m-%d").to_string())
        .bind(summary.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
