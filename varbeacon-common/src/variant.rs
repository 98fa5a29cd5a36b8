//! Variant coordinates, genotype calls and per-case allele tallies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{Case, Sex};

/// Human chromosome accepted by the beacon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Chromosome {
    /// Autosome 1-22
    Autosome(u8),
    X,
    Y,
}

impl Chromosome {
    /// Number of copies of this chromosome carried by an individual of the given sex
    ///
    /// Autosomes are diploid. Males are hemizygous on X and Y; females carry
    /// no Y. Unknown sex is treated as female on X and as male on Y, so that
    /// an individual never contributes opportunities it cannot have.
    pub fn ploidy(self, sex: Sex) -> u32 {
        match (self, sex) {
            (Chromosome::Autosome(_), _) => 2,
            (Chromosome::X, Sex::Male) => 1,
            (Chromosome::X, _) => 2,
            (Chromosome::Y, Sex::Female) => 0,
            (Chromosome::Y, _) => 1,
        }
    }
}

/// Chromosome token did not name 1-22, X or Y
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chromosome '{0}'")]
pub struct UnknownChromosome(pub String);

impl FromStr for Chromosome {
    type Err = UnknownChromosome;

    /// Case-sensitive; numeric tokens must not carry leading zeros
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Chromosome::X),
            "Y" => Ok(Chromosome::Y),
            _ => {
                let numeric = !s.is_empty()
                    && !s.starts_with('0')
                    && s.len() <= 2
                    && s.bytes().all(|b| b.is_ascii_digit());
                match s.parse::<u8>() {
                    Ok(n) if numeric && (1..=22).contains(&n) => Ok(Chromosome::Autosome(n)),
                    _ => Err(UnknownChromosome(s.to_string())),
                }
            }
        }
    }
}

impl TryFrom<String> for Chromosome {
    type Error = UnknownChromosome;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Chromosome> for String {
    fn from(chromosome: Chromosome) -> Self {
        chromosome.to_string()
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chromosome::Autosome(n) => write!(f, "{}", n),
            Chromosome::X => f.write_str("X"),
            Chromosome::Y => f.write_str("Y"),
        }
    }
}

/// A genotype call such as `0/1`, `1|1`, `./.` or a haploid `1`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Genotype {
    /// Allele indices; `None` is a no-call
    alleles: Vec<Option<u32>>,
}

impl Genotype {
    /// Parse a VCF-style GT string. Unparseable allele tokens count as no-calls.
    pub fn parse(gt: &str) -> Self {
        let alleles = gt
            .split(['/', '|'])
            .filter(|token| !token.is_empty())
            .map(|token| token.trim().parse::<u32>().ok())
            .collect();
        Self { alleles }
    }

    /// Number of called alleles that are not the reference
    pub fn alternate_alleles(&self) -> u32 {
        self.alleles
            .iter()
            .filter(|allele| matches!(allele, Some(index) if *index > 0))
            .count() as u32
    }
}

/// Exact coordinates of a small variant, start in the store's 1-based convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCoordinates {
    pub release: String,
    pub chromosome: Chromosome,
    pub start: u64,
    pub end: u64,
    pub reference: String,
    pub alternative: String,
}

/// One stored variant call of one case matching a query
#[derive(Debug, Clone, PartialEq)]
pub struct VariantMatch {
    pub variant: VariantCoordinates,
    pub case: Case,
    /// Genotype per pedigree member name
    pub genotypes: BTreeMap<String, Genotype>,
}

/// Per-case allele arithmetic used by every visibility tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlleleTally {
    /// Alternate alleles across all genotyped members
    pub alternate_alleles: u32,
    /// Members carrying at least one alternate allele
    pub carriers: u32,
    /// Allele opportunities (ploidy-aware) across all genotyped members
    pub opportunities: u32,
}

impl VariantMatch {
    /// Count alleles over pedigree members that have genotype data
    ///
    /// A member's alternate alleles are capped at its ploidy, so a
    /// hemizygous male called `1/1` on X contributes one allele.
    pub fn allele_tally(&self) -> AlleleTally {
        let mut tally = AlleleTally::default();
        for member in self.case.pedigree.iter().filter(|m| m.has_gt_entries) {
            let ploidy = self.variant.chromosome.ploidy(member.sex);
            if ploidy == 0 {
                continue;
            }
            let Some(genotype) = self.genotypes.get(&member.name) else {
                continue;
            };
            let alternate = genotype.alternate_alleles().min(ploidy);
            tally.opportunities += ploidy;
            tally.alternate_alleles += alternate;
            if alternate > 0 {
                tally.carriers += 1;
            }
        }
        tally
    }
}
