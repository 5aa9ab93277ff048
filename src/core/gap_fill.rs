use super::{
    call::{NoDataCall, NormalizedVariant, SampleCall, SampleVariantSet},
    coverage::CoverageSet,
    reference::ReferenceTable,
};
use crate::utils::util::Result;
use std::iter::Peekable;

#[derive(Debug)]
pub struct GapFillOutcome {
    pub calls: SampleVariantSet,
    pub gap_filled: usize,
}

/// Merges a sample's normalized variants with no-data calls for every uncovered position
/// that carries no variant of its own.
pub fn fill_gaps(
    sample: &str,
    mut variants: Vec<NormalizedVariant>,
    coverage: &CoverageSet,
    reference: &ReferenceTable,
) -> Result<GapFillOutcome> {
    variants.sort_by_key(|v| v.position);
    let reference_tag = variants.first().map(|v| v.reference_tag.clone());

    let mut calls = Vec::with_capacity(variants.len() + coverage.intervals().len());
    let mut gap_filled = 0usize;
    let mut uncovered: Peekable<_> = coverage.positions().peekable();

    for variant in variants {
        while let Some(&pos) = uncovered.peek() {
            if pos > variant.position {
                break;
            }
            uncovered.next();
            if pos < variant.position {
                calls.push(SampleCall::NoData(NoDataCall::new(
                    pos,
                    reference.base_at(pos)?,
                )));
                gap_filled += 1;
            } else {
                log::trace!("{sample}: variant at uncovered position {pos} kept over no-data call");
            }
        }
        calls.push(SampleCall::Variant(variant));
    }
    for pos in uncovered {
        calls.push(SampleCall::NoData(NoDataCall::new(
            pos,
            reference.base_at(pos)?,
        )));
        gap_filled += 1;
    }

    log::debug!(
        "{sample}: {} calls after filling {} uncovered positions",
        calls.len(),
        gap_filled
    );

    Ok(GapFillOutcome {
        calls: SampleVariantSet::new(sample, reference_tag, calls)?,
        gap_filled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        call::{AlignmentStats, CallStatus, VariantKind},
        coverage::AlignmentBlock,
    };

    fn snv(position: u64, ref_allele: &str, alt_allele: &str) -> NormalizedVariant {
        NormalizedVariant {
            position,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
            kind: VariantKind::Substitution,
            sample: "s1".to_string(),
            reference_tag: "chr".to_string(),
            stats: AlignmentStats::gap_fill_sentinel(),
        }
    }

    #[test]
    fn test_uncovered_positions_become_no_data_calls() {
        let reference = ReferenceTable::new("chr", b"ACGTA".to_vec());
        let coverage = CoverageSet::from_blocks(&[AlignmentBlock::new(1, 3)], 5);
        let outcome = fill_gaps("s1", vec![snv(2, "C", "T")], &coverage, &reference).unwrap();

        assert_eq!(outcome.gap_filled, 2);
        let set = &outcome.calls;
        assert_eq!(set.reference_tag.as_deref(), Some("chr"));
        assert_eq!(
            set.calls().iter().map(|c| c.position()).collect::<Vec<_>>(),
            vec![2, 4, 5]
        );
        assert_eq!(set.status_at(4), CallStatus::NoData { ref_allele: "T" });
        assert_eq!(set.status_at(5), CallStatus::NoData { ref_allele: "A" });
    }

    #[test]
    fn test_variant_wins_over_no_data_at_same_position() {
        let reference = ReferenceTable::new("chr", b"ACGTA".to_vec());
        let coverage = CoverageSet::from_blocks(&[], 5);
        let outcome = fill_gaps("s1", vec![snv(3, "G", "C")], &coverage, &reference).unwrap();

        assert_eq!(outcome.gap_filled, 4);
        assert_eq!(
            outcome.calls.status_at(3),
            CallStatus::Variant {
                ref_allele: "G",
                alt_allele: "C"
            }
        );
        assert_eq!(outcome.calls.len(), 5);
    }

    #[test]
    fn test_every_position_has_exactly_one_state() {
        let reference = ReferenceTable::new("chr", b"ACGTACGTAC".to_vec());
        let coverage = CoverageSet::from_blocks(
            &[AlignmentBlock::new(2, 4), AlignmentBlock::new(7, 9)],
            10,
        );
        let variants = vec![snv(3, "G", "A"), snv(8, "T", "C")];
        let outcome = fill_gaps("s1", variants, &coverage, &reference).unwrap();

        for pos in 1..=10u64 {
            let status = outcome.calls.status_at(pos);
            let expected_no_data = coverage.contains(pos);
            let expected_variant = pos == 3 || pos == 8;
            match status {
                CallStatus::NoData { .. } => assert!(expected_no_data, "pos {pos}"),
                CallStatus::Variant { .. } => assert!(expected_variant, "pos {pos}"),
                CallStatus::ReferenceMatch => {
                    assert!(!expected_no_data && !expected_variant, "pos {pos}")
                }
            }
        }
    }

    #[test]
    fn test_sample_without_variants_has_no_reference_tag() {
        let reference = ReferenceTable::new("chr", b"ACGTA".to_vec());
        let coverage = CoverageSet::from_blocks(&[AlignmentBlock::new(1, 5)], 5);
        let outcome = fill_gaps("s2", Vec::new(), &coverage, &reference).unwrap();
        assert!(outcome.calls.is_empty());
        assert!(outcome.calls.reference_tag.is_none());
        assert_eq!(outcome.gap_filled, 0);
    }
}
