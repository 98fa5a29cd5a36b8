//! Domain models: projects, cases, pedigrees, consortia and remote sites

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::engine::tier::VisibilityTier;

pub type ProjectId = i64;
pub type CaseId = i64;
pub type ConsortiumId = i64;
pub type ClientId = i64;

/// Sex of a pedigree member, stored with PED codes (0 unknown, 1 male, 2 female)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Sex {
    Unknown,
    Male,
    Female,
}

impl From<u8> for Sex {
    fn from(code: u8) -> Self {
        match code {
            1 => Sex::Male,
            2 => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

impl From<Sex> for u8 {
    fn from(sex: Sex) -> Self {
        match sex {
            Sex::Unknown => 0,
            Sex::Male => 1,
            Sex::Female => 2,
        }
    }
}

/// Affected status of a pedigree member (PED codes 0 unknown, 1 unaffected, 2 affected)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Affected {
    Unknown,
    Unaffected,
    Affected,
}

impl From<u8> for Affected {
    fn from(code: u8) -> Self {
        match code {
            1 => Affected::Unaffected,
            2 => Affected::Affected,
            _ => Affected::Unknown,
        }
    }
}

impl From<Affected> for u8 {
    fn from(status: Affected) -> Self {
        match status {
            Affected::Unknown => 0,
            Affected::Unaffected => 1,
            Affected::Affected => 2,
        }
    }
}

fn default_has_gt_entries() -> bool {
    true
}

/// One line of a case pedigree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeMember {
    #[serde(rename = "patient")]
    pub name: String,
    pub sex: Sex,
    pub affected: Affected,
    /// Whether genotype calls exist for this member
    #[serde(default = "default_has_gt_entries")]
    pub has_gt_entries: bool,
}

impl PedigreeMember {
    pub fn new(name: impl Into<String>, sex: Sex, affected: Affected) -> Self {
        Self {
            name: name.into(),
            sex,
            affected,
            has_gt_entries: true,
        }
    }
}

/// A sequenced family (or singleton) belonging to one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub project_id: ProjectId,
    pub name: String,
    /// Label of the index patient; disclosed only at the most open tier
    pub index: String,
    pub pedigree: Vec<PedigreeMember>,
    /// Exact phenotype terms recorded for the case
    pub phenotypes: Vec<String>,
}

/// Access-control group granting one visibility tier over a set of projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consortium {
    pub id: ConsortiumId,
    pub name: String,
    pub tier: VisibilityTier,
    pub projects: BTreeSet<ProjectId>,
}

impl Consortium {
    /// True if the consortium grants visibility over the project
    pub fn covers(&self, project: ProjectId) -> bool {
        self.projects.contains(&project)
    }
}

/// Remote site issuing queries with a static key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(skip_serializing)]
    pub key: String,
    /// Maximum number of answered queries per calendar day
    pub access_limit: u32,
    pub consortia: Vec<Consortium>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pedigree_member_deserializes_ped_codes() {
        let json = r#"{"patient": "index_001", "father": "0", "mother": "0",
                       "sex": 1, "affected": 2, "has_gt_entries": true}"#;
        let member: PedigreeMember = serde_json::from_str(json).unwrap();

        assert_eq!(member.name, "index_001");
        assert_eq!(member.sex, Sex::Male);
        assert_eq!(member.affected, Affected::Affected);
        assert!(member.has_gt_entries);
    }

    #[test]
    fn test_pedigree_member_defaults_gt_entries() {
        let json = r#"{"patient": "mother", "sex": 2, "affected": 1}"#;
        let member: PedigreeMember = serde_json::from_str(json).unwrap();

        assert_eq!(member.sex, Sex::Female);
        assert_eq!(member.affected, Affected::Unaffected);
        assert!(member.has_gt_entries);
    }

    #[test]
    fn test_unknown_sex_code() {
        assert_eq!(Sex::from(7), Sex::Unknown);
        assert_eq!(u8::from(Sex::Female), 2);
    }

    #[test]
    fn test_consortium_covers() {
        let consortium = Consortium {
            id: 1,
            name: "rare-disease".to_string(),
            tier: VisibilityTier::Count,
            projects: [3, 5].into_iter().collect(),
        };

        assert!(consortium.covers(3));
        assert!(!consortium.covers(4));
    }
}
