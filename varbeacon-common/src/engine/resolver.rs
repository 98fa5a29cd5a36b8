//! Visibility resolution: which tier applies to a case for a given client

use std::collections::BTreeSet;

use super::tier::VisibilityTier;
use crate::models::{Consortium, ProjectId};

/// Tier a client sees a project's cases under
///
/// Minimum level over the client's consortia that cover the project.
/// `None` means the project is invisible to the client and its cases are
/// skipped entirely.
pub fn resolve_tier(project: ProjectId, client_consortia: &[Consortium]) -> Option<VisibilityTier> {
    client_consortia
        .iter()
        .filter(|consortium| consortium.covers(project))
        .map(|consortium| consortium.tier)
        .min()
}

/// Every project visible through at least one of the client's consortia
///
/// Handed to the store so invisible cases are never loaded.
pub fn visible_projects(client_consortia: &[Consortium]) -> BTreeSet<ProjectId> {
    client_consortia
        .iter()
        .flat_map(|consortium| consortium.projects.iter().copied())
        .collect()
}
