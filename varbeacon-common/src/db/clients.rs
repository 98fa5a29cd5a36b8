//! SQLite directory of remote sites and their consortia

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;

use crate::engine::ports::ClientDirectory;
use crate::engine::tier::VisibilityTier;
use crate::models::{Client, Consortium, ConsortiumId, ProjectId};
use crate::{Error, Result};

pub struct SqliteClientDirectory {
    pool: SqlitePool,
}

impl SqliteClientDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn consortia(&self, remote_site_id: i64) -> Result<Vec<Consortium>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.visibility_level
            FROM consortia c
            JOIN remote_site_consortia rc ON rc.consortium_id = c.id
            WHERE rc.remote_site_id = ?
            ORDER BY c.id
            "#,
        )
        .bind(remote_site_id)
        .fetch_all(&self.pool)
        .await?;

        let mut consortia = Vec::with_capacity(rows.len());
        for row in rows {
            let id: ConsortiumId = row.try_get("id")?;
            let level: i64 = row.try_get("visibility_level")?;
            let tier = VisibilityTier::try_from(level)
                .map_err(|e| Error::InvalidInput(format!("consortium {}: {}", id, e)))?;
            let projects: Vec<ProjectId> = sqlx::query_scalar(
                "SELECT project_id FROM consortium_projects WHERE consortium_id = ?",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

            consortia.push(Consortium {
                id,
                name: row.try_get("name")?,
                tier,
                projects: projects.into_iter().collect::<BTreeSet<_>>(),
            });
        }
        Ok(consortia)
    }
}

#[async_trait]
impl ClientDirectory for SqliteClientDirectory {
    async fn find_by_key(&self, key: &str) -> Result<Option<Client>> {
        let row = sqlx::query("SELECT id, name, key, access_limit FROM remote_sites WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.try_get("id")?;
        let access_limit: i64 = row.try_get("access_limit")?;
        Ok(Some(Client {
            id,
            name: row.try_get("name")?,
            key: row.try_get("key")?,
            access_limit: u32::try_from(access_limit.max(0)).unwrap_or(u32::MAX),
            consortia: self.consortia(id).await?,
        }))
    }
}
