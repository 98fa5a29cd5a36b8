//! Visibility tiers
//!
//! Lower numeric level means more disclosure. The derived ordering follows
//! the numeric level, so `min()` over a set of tiers picks the most open one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VisibilityTier {
    /// Level 0: everything below plus case index labels
    Full,
    /// Level 5: exact count plus exact phenotype terms
    Phenotype,
    /// Level 10: exact count plus coarsened phenotype terms
    CoarsePhenotype,
    /// Level 15: exact alternate-allele count
    Count,
    /// Level 20: count contributes to the >10 threshold flag only
    Threshold,
    /// Level 25: existence, sample count and frequency denominator
    Existence,
}

impl VisibilityTier {
    pub const ALL: [VisibilityTier; 6] = [
        VisibilityTier::Full,
        VisibilityTier::Phenotype,
        VisibilityTier::CoarsePhenotype,
        VisibilityTier::Count,
        VisibilityTier::Threshold,
        VisibilityTier::Existence,
    ];

    /// Numeric level as stored on consortia
    pub fn level(self) -> u8 {
        match self {
            VisibilityTier::Full => 0,
            VisibilityTier::Phenotype => 5,
            VisibilityTier::CoarsePhenotype => 10,
            VisibilityTier::Count => 15,
            VisibilityTier::Threshold => 20,
            VisibilityTier::Existence => 25,
        }
    }
}

/// Numeric level outside {0, 5, 10, 15, 20, 25}
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid visibility level {0} (expected 0, 5, 10, 15, 20 or 25)")]
pub struct InvalidTier(pub i64);

impl TryFrom<u8> for VisibilityTier {
    type Error = InvalidTier;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        VisibilityTier::try_from(i64::from(level))
    }
}

impl TryFrom<i64> for VisibilityTier {
    type Error = InvalidTier;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        VisibilityTier::ALL
            .into_iter()
            .find(|tier| i64::from(tier.level()) == level)
            .ok_or(InvalidTier(level))
    }
}

impl From<VisibilityTier> for u8 {
    fn from(tier: VisibilityTier) -> Self {
        tier.level()
    }
}

impl FromStr for VisibilityTier {
    type Err = InvalidTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s.trim().parse::<i64>().map_err(|_| InvalidTier(-1))?;
        VisibilityTier::try_from(level)
    }
}

impl fmt::Display for VisibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}
