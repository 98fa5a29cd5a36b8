//! Phenotype coarsening: exact ontology terms to bounded-depth ancestors

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

use super::ports::OntologyLookup;

/// Depth below the ontology root that coarse terms are drawn from
pub const DEFAULT_COARSE_DEPTH: usize = 4;

/// What to disclose for a term whose ancestors could not be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OntologyFallback {
    /// Keep the exact term (logged)
    #[default]
    ExactTerm,
    /// Drop the term from the coarse set
    Omit,
}

pub struct PhenotypeCoarsener {
    ontology: Arc<dyn OntologyLookup>,
    depth: usize,
    fallback: OntologyFallback,
}

impl PhenotypeCoarsener {
    pub fn new(ontology: Arc<dyn OntologyLookup>, depth: usize, fallback: OntologyFallback) -> Self {
        Self {
            ontology,
            depth,
            fallback,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Coarse terms standing in for `term`
    ///
    /// A term already at or above the coarse depth is returned unchanged.
    pub fn coarsen(&self, term: &str) -> BTreeSet<String> {
        match self.ontology.ancestors_at_depth(term, self.depth) {
            Ok(ancestors) if ancestors.is_empty() => BTreeSet::from([term.to_string()]),
            Ok(ancestors) => ancestors,
            Err(e) => {
                warn!(
                    term,
                    error = %e,
                    fallback = ?self.fallback,
                    "Ontology lookup degraded while coarsening phenotype"
                );
                match self.fallback {
                    OntologyFallback::ExactTerm => BTreeSet::from([term.to_string()]),
                    OntologyFallback::Omit => BTreeSet::new(),
                }
            }
        }
    }

    /// Union of the coarse terms of every exact term
    pub fn coarsen_all<'a>(&self, terms: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
        terms.into_iter().flat_map(|term| self.coarsen(term)).collect()
    }
}
