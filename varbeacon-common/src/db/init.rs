//! Database initialization
//!
//! Opens (creating if needed) the SQLite beacon database and creates the
//! schema. Every statement is `CREATE ... IF NOT EXISTS`, so running it
//! against an existing database is a no-op.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version, recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    // Readers (queries) proceed alongside the audit writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every beacon table and index on an open pool
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_projects_table(pool).await?;
    create_cases_table(pool).await?;
    create_phenotypes_table(pool).await?;
    create_variants_table(pool).await?;
    create_consortia_tables(pool).await?;
    create_remote_sites_tables(pool).await?;
    create_audit_log_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Cases carry their pedigree as a JSON array of
/// `{"patient", "sex", "affected", "has_gt_entries"}` objects
async fn create_cases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cases (
            id INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            index_label TEXT NOT NULL,
            pedigree TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cases_project ON cases(project_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_phenotypes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phenotypes (
            id INTEGER PRIMARY KEY,
            case_id INTEGER NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
            term TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_phenotypes_case ON phenotypes(case_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Variant calls, 1-based start; `genotype` maps member name to `{"gt": ...}`
async fn create_variants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS variants (
            id INTEGER PRIMARY KEY,
            release TEXT NOT NULL,
            chromosome TEXT NOT NULL,
            start INTEGER NOT NULL,
            "end" INTEGER NOT NULL,
            reference TEXT NOT NULL,
            alternative TEXT NOT NULL,
            case_id INTEGER NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
            genotype TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_variants_coordinates
        ON variants(release, chromosome, start, "end", reference, alternative)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_consortia_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consortia (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            visibility_level INTEGER NOT NULL
                CHECK (visibility_level IN (0, 5, 10, 15, 20, 25))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consortium_projects (
            consortium_id INTEGER NOT NULL REFERENCES consortia(id) ON DELETE CASCADE,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            PRIMARY KEY (consortium_id, project_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_remote_sites_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS remote_sites (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            key TEXT NOT NULL UNIQUE,
            access_limit INTEGER NOT NULL DEFAULT 0 CHECK (access_limit >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS remote_site_consortia (
            remote_site_id INTEGER NOT NULL REFERENCES remote_sites(id) ON DELETE CASCADE,
            consortium_id INTEGER NOT NULL REFERENCES consortia(id) ON DELETE CASCADE,
            PRIMARY KEY (remote_site_id, consortium_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per answered query; `day` is the local calendar day (YYYY-MM-DD)
async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY,
            request_id TEXT NOT NULL UNIQUE,
            remote_site_id INTEGER REFERENCES remote_sites(id) ON DELETE SET NULL,
            remote_site_name TEXT NOT NULL,
            request TEXT NOT NULL,
            variant_exists INTEGER NOT NULL,
            touched_cases TEXT NOT NULL DEFAULT '[]',
            day TEXT NOT NULL,
            date_time TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_site_day ON audit_log(remote_site_id, day)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
