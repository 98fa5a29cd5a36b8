//! SQLite variant store

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::engine::ports::{StoreQuery, VariantStore};
use crate::models::{Case, CaseId, PedigreeMember};
use crate::variant::{Chromosome, Genotype, VariantCoordinates, VariantMatch};
use crate::{Error, Result};

/// Per-member entry of the stored genotype document; only `gt` is read
#[derive(Debug, Deserialize)]
struct GenotypeEntry {
    gt: String,
}

pub struct SqliteVariantStore {
    pool: SqlitePool,
}

impl SqliteVariantStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn phenotypes(&self, case_id: CaseId) -> Result<Vec<String>> {
        let terms: Vec<String> =
            sqlx::query_scalar("SELECT term FROM phenotypes WHERE case_id = ? ORDER BY id")
                .bind(case_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(terms)
    }
}

fn parse_genotypes(document: &str) -> Result<BTreeMap<String, Genotype>> {
    let entries: HashMap<String, GenotypeEntry> = serde_json::from_str(document)?;
    Ok(entries
        .into_iter()
        .map(|(member, entry)| (member, Genotype::parse(&entry.gt)))
        .collect())
}

#[async_trait]
impl VariantStore for SqliteVariantStore {
    async fn find(&self, query: &StoreQuery) -> Result<Vec<VariantMatch>> {
        if query.allowed_projects.is_empty() {
            return Ok(Vec::new());
        }
        let (Ok(start), Ok(end)) = (i64::try_from(query.start), i64::try_from(query.end)) else {
            debug!(start = query.start, end = query.end, "Coordinates beyond stored range");
            return Ok(Vec::new());
        };
        let allowed = serde_json::to_string(&query.allowed_projects)?;

        let rows = sqlx::query(
            r#"
            SELECT v.release, v.chromosome, v.start, v."end", v.reference, v.alternative,
                   v.genotype, c.id AS case_id, c.project_id, c.name, c.index_label, c.pedigree
            FROM variants v
            JOIN cases c ON c.id = v.case_id
            WHERE v.release = ? AND v.chromosome = ? AND v.start = ? AND v."end" = ?
              AND v.reference = ? AND v.alternative = ?
              AND c.project_id IN (SELECT value FROM json_each(?))
            ORDER BY c.id
            "#,
        )
        .bind(&query.assembly)
        .bind(query.chromosome.to_string())
        .bind(start)
        .bind(end)
        .bind(&query.reference)
        .bind(&query.alternative)
        .bind(allowed)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let case_id: CaseId = row.try_get("case_id")?;
            let chromosome: String = row.try_get("chromosome")?;
            let chromosome = chromosome
                .parse::<Chromosome>()
                .map_err(|e| Error::InvalidInput(format!("variant of case {}: {}", case_id, e)))?;
            let start: i64 = row.try_get("start")?;
            let end: i64 = row.try_get("end")?;
            let pedigree: String = row.try_get("pedigree")?;
            let genotype: String = row.try_get("genotype")?;

            matches.push(VariantMatch {
                variant: VariantCoordinates {
                    release: row.try_get("release")?,
                    chromosome,
                    start: start.max(0) as u64,
                    end: end.max(0) as u64,
                    reference: row.try_get("reference")?,
                    alternative: row.try_get("alternative")?,
                },
                case: Case {
                    id: case_id,
                    project_id: row.try_get("project_id")?,
                    name: row.try_get("name")?,
                    index: row.try_get("index_label")?,
                    pedigree: serde_json::from_str::<Vec<PedigreeMember>>(&pedigree)?,
                    phenotypes: self.phenotypes(case_id).await?,
                },
                genotypes: parse_genotypes(&genotype)?,
            });
        }

        debug!(
            request = %format!("{}:{}-{}", query.chromosome, query.start, query.end),
            matches = matches.len(),
            "Variant store lookup"
        );
        Ok(matches)
    }
}
