//! # Variant Beacon Common Library
//!
//! Shared code for the variant beacon:
//! - Domain models (cases, pedigrees, consortia, remote sites)
//! - The tiered disclosure engine and its ports
//! - OBO ontology adapter for phenotype coarsening
//! - SQLite adapters for the store, client directory and audit log
//! - Beacon protocol response types
//! - Configuration loading

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod ontology;
pub mod time;
pub mod variant;

pub use engine::{QueryEngine, QueryOutcome, RawQuery, Rejection, VisibilityTier};
pub use error::{Error, Result};
