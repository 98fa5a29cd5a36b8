//! Disclosure accumulation
//!
//! Each visibility tier maps to an ordered list of fold steps. A record is
//! folded by running the steps of its own tier over the running state, so a
//! single query can mix records disclosed under different tiers while every
//! case discloses only what its tier allows.
//!
//! | tier | steps |
//! |------|-------|
//! | 25   | existence |
//! | 20   | existence, hidden count |
//! | 15   | existence, disclosed count |
//! | 10   | existence, disclosed count, coarse phenotypes |
//! | 5    | existence, disclosed count, exact phenotypes |
//! | 0    | existence, disclosed count, exact phenotypes, case index |

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use super::coarsener::PhenotypeCoarsener;
use super::tier::VisibilityTier;
use crate::models::CaseId;
use crate::variant::{AlleleTally, VariantMatch};

/// Threshold above which the combined count raises `variant_count_greater_than_ten`
pub const VARIANT_COUNT_THRESHOLD: u32 = 10;

/// Running aggregate of one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulationState {
    pub exists: bool,
    pub sample_count: u32,
    /// Alternate alleles from cases visible at tier 15 or lower
    pub variant_count: u32,
    /// Alternate alleles from tier-20 cases; only feeds the threshold flag
    pub internal_variant_count: u32,
    pub frequency_denominator: u32,
    pub coarse_phenotypes: BTreeSet<String>,
    pub phenotypes: BTreeSet<String>,
    pub case_indices: Vec<String>,
    /// Every case folded in, whatever its tier
    pub touched_cases: Vec<CaseId>,
}

/// Everything a fold step may read about the record being folded
pub struct FoldInput<'a> {
    pub record: &'a VariantMatch,
    pub tally: AlleleTally,
    pub coarsener: &'a PhenotypeCoarsener,
}

pub type FoldStep = fn(AccumulationState, &FoldInput<'_>) -> AccumulationState;

fn record_existence(mut state: AccumulationState, input: &FoldInput<'_>) -> AccumulationState {
    state.exists = true;
    state.sample_count += input.tally.carriers;
    state.frequency_denominator += input.tally.opportunities;
    state.touched_cases.push(input.record.case.id);
    state
}

fn count_hidden(mut state: AccumulationState, input: &FoldInput<'_>) -> AccumulationState {
    state.internal_variant_count += input.tally.alternate_alleles;
    state
}

fn count_disclosed(mut state: AccumulationState, input: &FoldInput<'_>) -> AccumulationState {
    state.variant_count += input.tally.alternate_alleles;
    state
}

fn union_coarse_phenotypes(mut state: AccumulationState, input: &FoldInput<'_>) -> AccumulationState {
    let coarse = input.coarsener.coarsen_all(input.record.case.phenotypes.iter());
    state.coarse_phenotypes.extend(coarse);
    state
}

fn union_phenotypes(mut state: AccumulationState, input: &FoldInput<'_>) -> AccumulationState {
    state
        .phenotypes
        .extend(input.record.case.phenotypes.iter().cloned());
    state
}

fn append_case_index(mut state: AccumulationState, input: &FoldInput<'_>) -> AccumulationState {
    state.case_indices.push(input.record.case.index.clone());
    state
}

const EXISTENCE_STEPS: &[FoldStep] = &[record_existence];
const THRESHOLD_STEPS: &[FoldStep] = &[record_existence, count_hidden];
const COUNT_STEPS: &[FoldStep] = &[record_existence, count_disclosed];
const COARSE_PHENOTYPE_STEPS: &[FoldStep] =
    &[record_existence, count_disclosed, union_coarse_phenotypes];
const PHENOTYPE_STEPS: &[FoldStep] = &[record_existence, count_disclosed, union_phenotypes];
const FULL_STEPS: &[FoldStep] = &[
    record_existence,
    count_disclosed,
    union_phenotypes,
    append_case_index,
];

/// Disclosure policy: the fold steps a tier runs, in order
pub fn pipeline(tier: VisibilityTier) -> &'static [FoldStep] {
    match tier {
        VisibilityTier::Existence => EXISTENCE_STEPS,
        VisibilityTier::Threshold => THRESHOLD_STEPS,
        VisibilityTier::Count => COUNT_STEPS,
        VisibilityTier::CoarsePhenotype => COARSE_PHENOTYPE_STEPS,
        VisibilityTier::Phenotype => PHENOTYPE_STEPS,
        VisibilityTier::Full => FULL_STEPS,
    }
}

/// Fold one record into the aggregate under the record's own tier
pub fn fold(
    state: AccumulationState,
    record: &VariantMatch,
    tier: VisibilityTier,
    coarsener: &PhenotypeCoarsener,
) -> AccumulationState {
    let input = FoldInput {
        record,
        tally: record.allele_tally(),
        coarsener,
    };
    debug!(
        case_id = record.case.id,
        tier = tier.level(),
        alternate_alleles = input.tally.alternate_alleles,
        "Folding variant record"
    );
    pipeline(tier)
        .iter()
        .fold(state, |state, step| step(state, &input))
}

/// Final disclosed aggregate of one query
///
/// Fields no processed record was allowed to disclose keep their neutral
/// value (`false`, `0`, empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub exists: bool,
    pub sample_count: u32,
    pub variant_count: u32,
    pub variant_count_greater_than_ten: bool,
    pub frequency: f64,
    pub coarse_phenotypes: Vec<String>,
    pub phenotypes: Vec<String>,
    pub case_indices: Vec<String>,
}

impl AccumulationState {
    /// True iff disclosed and hidden counts together exceed the threshold
    pub fn variant_count_greater_than_ten(&self) -> bool {
        self.variant_count + self.internal_variant_count > VARIANT_COUNT_THRESHOLD
    }

    /// Disclosed alternate-allele frequency, rounded to two decimals
    pub fn frequency(&self) -> f64 {
        if self.frequency_denominator == 0 {
            return 0.0;
        }
        let raw = f64::from(self.variant_count) / f64::from(self.frequency_denominator);
        (raw * 100.0).round() / 100.0
    }

    /// Consume the state into the disclosed aggregate and the touched cases
    pub fn finish(self) -> (Aggregate, Vec<CaseId>) {
        let aggregate = Aggregate {
            exists: self.exists,
            sample_count: self.sample_count,
            variant_count: self.variant_count,
            variant_count_greater_than_ten: self.variant_count_greater_than_ten(),
            frequency: self.frequency(),
            coarse_phenotypes: self.coarse_phenotypes.into_iter().collect(),
            phenotypes: self.phenotypes.into_iter().collect(),
            case_indices: {
                let mut indices = self.case_indices;
                indices.sort();
                indices
            },
        };
        (aggregate, self.touched_cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::coarsener::OntologyFallback;
    use crate::engine::ports::{OntologyError, OntologyLookup};
    use crate::models::{Affected, Case, PedigreeMember, Sex};
    use crate::variant::{Chromosome, Genotype, VariantCoordinates};
    use std::sync::Arc;

    /// Every term coarsens to "HP:0000118"
    struct FlatOntology;

    impl OntologyLookup for FlatOntology {
        fn ancestors_at_depth(&self, _: &str, _: usize) -> Result<BTreeSet<String>, OntologyError> {
            Ok(BTreeSet::from(["HP:0000118".to_string()]))
        }
    }

    fn coarsener() -> PhenotypeCoarsener {
        PhenotypeCoarsener::new(Arc::new(FlatOntology), 4, OntologyFallback::ExactTerm)
    }

    /// Singleton case with one heterozygous carrier on chromosome 1
    fn heterozygous_record(case_id: i64) -> VariantMatch {
        let index = format!("index_{:03}-N1-DNA1-WES1", case_id);
        VariantMatch {
            variant: VariantCoordinates {
                release: "GRCh37".to_string(),
                chromosome: Chromosome::Autosome(1),
                start: 100,
                end: 100,
                reference: "A".to_string(),
                alternative: "C".to_string(),
            },
            case: Case {
                id: case_id,
                project_id: 1,
                name: format!("case {:03}: singleton", case_id),
                index: index.clone(),
                pedigree: vec![PedigreeMember::new(index.clone(), Sex::Male, Affected::Affected)],
                phenotypes: vec!["HP:0001049".to_string()],
            },
            genotypes: [(index, Genotype::parse("0/1"))].into_iter().collect(),
        }
    }

    #[test]
    fn test_existence_tier() {
        let state = fold(
            AccumulationState::default(),
            &heterozygous_record(1),
            VisibilityTier::Existence,
            &coarsener(),
        );

        assert!(state.exists);
        assert_eq!(state.sample_count, 1);
        assert_eq!(state.frequency_denominator, 2);
        assert_eq!(state.variant_count, 0);
        assert_eq!(state.internal_variant_count, 0);
        assert!(state.coarse_phenotypes.is_empty());
        assert!(state.phenotypes.is_empty());
        assert!(state.case_indices.is_empty());
        assert_eq!(state.touched_cases, vec![1]);
        assert_eq!(state.frequency(), 0.0);
    }

    #[test]
    fn test_threshold_tier_counts_hidden() {
        let record = heterozygous_record(1);
        let c = coarsener();
        let mut state = AccumulationState::default();
        for i in 1..=10 {
            state = fold(state, &record, VisibilityTier::Threshold, &c);
            assert_eq!(state.internal_variant_count, i);
            assert_eq!(state.variant_count, 0);
            assert!(!state.variant_count_greater_than_ten());
        }
        state = fold(state, &record, VisibilityTier::Threshold, &c);
        assert!(state.variant_count_greater_than_ten());
        assert_eq!(state.frequency(), 0.0);
    }

    #[test]
    fn test_threshold_counts_mixed_split() {
        let record = heterozygous_record(1);
        let c = coarsener();
        let mut state = AccumulationState::default();
        for _ in 0..5 {
            state = fold(state, &record, VisibilityTier::Threshold, &c);
            state = fold(state, &record, VisibilityTier::Count, &c);
        }
        assert!(!state.variant_count_greater_than_ten());
        state = fold(state, &record, VisibilityTier::Count, &c);

        assert_eq!(state.variant_count, 6);
        assert_eq!(state.internal_variant_count, 5);
        assert!(state.variant_count_greater_than_ten());
    }

    #[test]
    fn test_count_tier() {
        let record = heterozygous_record(1);
        let c = coarsener();
        let mut state = AccumulationState::default();
        for i in 1..=10 {
            state = fold(state, &record, VisibilityTier::Count, &c);
            assert_eq!(state.variant_count, i);
            assert_eq!(state.internal_variant_count, 0);
            assert!(state.phenotypes.is_empty());
            assert!(state.coarse_phenotypes.is_empty());
        }
        assert_eq!(state.frequency(), 0.5);
    }

    #[test]
    fn test_coarse_phenotype_tier() {
        let state = fold(
            AccumulationState::default(),
            &heterozygous_record(1),
            VisibilityTier::CoarsePhenotype,
            &coarsener(),
        );

        assert_eq!(state.variant_count, 1);
        assert_eq!(state.coarse_phenotypes, BTreeSet::from(["HP:0000118".to_string()]));
        assert!(state.phenotypes.is_empty());
        assert!(state.case_indices.is_empty());
    }

    #[test]
    fn test_phenotype_tier_excludes_coarse() {
        let state = fold(
            AccumulationState::default(),
            &heterozygous_record(1),
            VisibilityTier::Phenotype,
            &coarsener(),
        );

        assert_eq!(state.variant_count, 1);
        assert_eq!(state.phenotypes, BTreeSet::from(["HP:0001049".to_string()]));
        assert!(state.coarse_phenotypes.is_empty());
        assert!(state.case_indices.is_empty());
    }

    #[test]
    fn test_full_tier_appends_case_index() {
        let record = heterozygous_record(7);
        let c = coarsener();
        let mut state = AccumulationState::default();
        for i in 1..=3 {
            state = fold(state, &record, VisibilityTier::Full, &c);
            assert_eq!(state.case_indices, vec![record.case.index.clone(); i]);
        }
        assert!(!state.phenotypes.is_empty());
        assert!(state.coarse_phenotypes.is_empty());
    }

    #[test]
    fn test_lower_tier_discloses_superset() {
        // Disclosed fields of a tier, as flags, compared against every more open tier
        fn disclosed(tier: VisibilityTier) -> [bool; 5] {
            let state = fold(AccumulationState::default(), &heterozygous_record(1), tier, &coarsener());
            [
                state.exists,
                state.variant_count > 0,
                !state.coarse_phenotypes.is_empty(),
                !state.phenotypes.is_empty(),
                !state.case_indices.is_empty(),
            ]
        }

        // Coarse (10) and exact (5) phenotype are separate branches above 15
        let chains = [
            [VisibilityTier::Existence, VisibilityTier::Count, VisibilityTier::CoarsePhenotype],
            [VisibilityTier::Existence, VisibilityTier::Count, VisibilityTier::Phenotype],
            [VisibilityTier::Count, VisibilityTier::Phenotype, VisibilityTier::Full],
        ];
        for chain in chains {
            for pair in chain.windows(2) {
                let (closed, open) = (disclosed(pair[0]), disclosed(pair[1]));
                for (c, o) in closed.iter().zip(open.iter()) {
                    assert!(!c || *o, "tier {} discloses a field tier {} hides", pair[0], pair[1]);
                }
            }
        }
    }

    #[test]
    fn test_finish_sorts_and_rounds() {
        let c = coarsener();
        let mut state = AccumulationState::default();
        for id in [3, 1, 2] {
            state = fold(state, &heterozygous_record(id), VisibilityTier::Full, &c);
        }
        let (aggregate, touched) = state.finish();

        assert_eq!(touched, vec![3, 1, 2]);
        assert_eq!(
            aggregate.case_indices,
            vec![
                "index_001-N1-DNA1-WES1".to_string(),
                "index_002-N1-DNA1-WES1".to_string(),
                "index_003-N1-DNA1-WES1".to_string(),
            ]
        );
        assert_eq!(aggregate.frequency, 0.5);
        assert_eq!(aggregate.variant_count, 3);
    }

    #[test]
    fn test_frequency_bounds() {
        let mut state = AccumulationState {
            variant_count: 2,
            frequency_denominator: 3,
            ..Default::default()
        };
        assert_eq!(state.frequency(), 0.67);
        state.variant_count = 3;
        assert_eq!(state.frequency(), 1.0);
        state.frequency_denominator = 0;
        assert_eq!(state.frequency(), 0.0);
    }
}
