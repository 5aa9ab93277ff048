//! Joint assembly of every sample's calls into one position-sorted table.
//!
//! Rows are keyed by `(position, REF)`. Samples whose calls share a REF string
//! at a position share a row; a sample holding a different REF at the same
//! anchor gets its own row. Positions where no sample has a call are omitted.

use super::{call::SampleVariantSet, genotype::Genotype, reference::ReferenceTable};
use crate::{constants::NO_DATA_ALLELE, utils::util::Result};
use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, BinaryHeap, HashSet},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointRow {
    pub position: u64,
    pub ref_allele: String,
    pub alt_alleles: Vec<String>,
    /// One genotype per sample, in `VariantMatrix::samples` order.
    pub genotypes: Vec<Genotype>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMatrix {
    pub contig: String,
    pub reference_length: u64,
    pub samples: Vec<String>,
    pub rows: Vec<JointRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixStats {
    pub rows: usize,
    /// Positions where samples disagree on the REF allele.
    pub conflicting_ref_positions: usize,
    /// Rows whose REF does not start with the reference base at their position.
    pub ref_mismatches: usize,
}

/// Heap cursor into one sample's call list.
#[derive(Debug, PartialEq, Eq)]
struct Cursor {
    position: u64,
    sample_idx: usize,
    call_idx: usize,
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.position, self.sample_idx).cmp(&(other.position, other.sample_idx))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct VariantMatrixBuilder<'a> {
    contig: String,
    reference: &'a ReferenceTable,
    sets: Vec<SampleVariantSet>,
}

impl<'a> VariantMatrixBuilder<'a> {
    pub fn new(contig: impl Into<String>, reference: &'a ReferenceTable) -> Self {
        Self {
            contig: contig.into(),
            reference,
            sets: Vec::new(),
        }
    }

    pub fn add_sample(&mut self, set: SampleVariantSet) -> &mut Self {
        self.sets.push(set);
        self
    }

    pub fn build(self) -> Result<(VariantMatrix, MatrixStats)> {
        let VariantMatrixBuilder {
            contig,
            reference,
            mut sets,
        } = self;

        sets.sort_by(|a, b| a.sample.cmp(&b.sample));
        let mut seen = HashSet::with_capacity(sets.len());
        for set in &sets {
            if !seen.insert(set.sample.as_str()) {
                return Err(crate::wga_error!(
                    "Sample name {} is used more than once",
                    set.sample
                ));
            }
        }

        let mut heap: BinaryHeap<Reverse<Cursor>> = sets
            .iter()
            .enumerate()
            .filter_map(|(sample_idx, set)| {
                set.calls().first().map(|call| {
                    Reverse(Cursor {
                        position: call.position(),
                        sample_idx,
                        call_idx: 0,
                    })
                })
            })
            .collect();

        let mut stats = MatrixStats::default();
        let mut rows = Vec::new();

        while let Some(Reverse(head)) = heap.peek() {
            let position = head.position;
            let mut by_ref: BTreeMap<&str, Vec<(usize, &str)>> = BTreeMap::new();

            while let Some(Reverse(cursor)) = heap.peek() {
                if cursor.position != position {
                    break;
                }
                let Some(Reverse(cursor)) = heap.pop() else {
                    break;
                };
                let calls = sets[cursor.sample_idx].calls();
                let status = calls[cursor.call_idx].status();
                if let (Some(ref_allele), Some(alt_allele)) =
                    (status.ref_allele(), status.alt_allele())
                {
                    by_ref
                        .entry(ref_allele)
                        .or_default()
                        .push((cursor.sample_idx, alt_allele));
                }
                let next_idx = cursor.call_idx + 1;
                if let Some(next) = calls.get(next_idx) {
                    heap.push(Reverse(Cursor {
                        position: next.position(),
                        sample_idx: cursor.sample_idx,
                        call_idx: next_idx,
                    }));
                }
            }

            if by_ref.len() > 1 {
                stats.conflicting_ref_positions += 1;
                log::debug!(
                    "Position {position}: {} different REF alleles, emitting one row each",
                    by_ref.len()
                );
            }

            let ref_base = reference.base_at(position)?;
            for (ref_allele, members) in &by_ref {
                if !ref_allele.starts_with(ref_base) {
                    stats.ref_mismatches += 1;
                    log::warn!(
                        "REF {ref_allele} at {position} does not match reference base {ref_base}"
                    );
                }
                rows.push(assemble_row(position, ref_allele, members, sets.len()));
            }
        }

        stats.rows = rows.len();
        let matrix = VariantMatrix {
            contig,
            reference_length: reference.len(),
            samples: sets.into_iter().map(|set| set.sample).collect(),
            rows,
        };
        Ok((matrix, stats))
    }
}

/// Orders ALT alleles lexicographically with the no-data pseudo-allele last.
fn alt_order(a: &str, b: &str) -> Ordering {
    let a_no_data = a == NO_DATA_ALLELE;
    let b_no_data = b == NO_DATA_ALLELE;
    a_no_data.cmp(&b_no_data).then_with(|| a.cmp(b))
}

fn assemble_row(
    position: u64,
    ref_allele: &str,
    members: &[(usize, &str)],
    n_samples: usize,
) -> JointRow {
    let mut alt_alleles: Vec<&str> = members.iter().map(|&(_, alt)| alt).collect();
    alt_alleles.sort_by(|a, b| alt_order(a, b));
    alt_alleles.dedup();

    let mut genotypes = vec![Genotype::hom_ref(); n_samples];
    for &(sample_idx, alt) in members {
        if let Some(idx) = alt_alleles.iter().position(|&a| a == alt) {
            genotypes[sample_idx] = Genotype::homozygous(idx as u32 + 1);
        }
    }

    JointRow {
        position,
        ref_allele: ref_allele.to_string(),
        alt_alleles: alt_alleles.into_iter().map(str::to_string).collect(),
        genotypes,
    }
}
