//! Removal of the "N" no-data pseudo-allele from assembled records.
//!
//! The REF allele keeps index 0, surviving ALT alleles are renumbered from 1 in
//! their original order, and genotype alleles pointing at "N" become missing.
//! A record left without any ALT allele is dropped.

use super::{genotype::Genotype, matrix::JointRow};
use crate::{constants::NO_DATA_ALLELE, error::WgaError};

/// Old allele index -> new allele index for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleIndexMap {
    mapping: Vec<Option<u32>>,
}

impl AlleleIndexMap {
    /// Returns the surviving ALT alleles and the index map, or `None` when no ALT is "N".
    pub fn from_alts<S: AsRef<str>>(alts: &[S]) -> Option<(Vec<String>, Self)> {
        let is_no_data = |alt: &S| alt.as_ref().eq_ignore_ascii_case(NO_DATA_ALLELE);
        if !alts.iter().any(is_no_data) {
            return None;
        }

        let mut mapping = Vec::with_capacity(alts.len() + 1);
        mapping.push(Some(0));
        let mut kept = Vec::with_capacity(alts.len());
        for alt in alts {
            if is_no_data(alt) {
                mapping.push(None);
            } else {
                kept.push(alt.as_ref().to_string());
                mapping.push(Some(kept.len() as u32));
            }
        }
        Some((kept, Self { mapping }))
    }

    pub fn n_alleles(&self) -> usize {
        self.mapping.len()
    }

    /// `Err` when the index points past the record's alleles.
    pub fn map(&self, index: u32) -> std::result::Result<Option<u32>, ()> {
        self.mapping.get(index as usize).copied().ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub records_seen: u64,
    pub records_remapped: u64,
    pub records_dropped: u64,
    pub n_alleles_removed: u64,
    pub genotypes_changed: u64,
    pub genotypes_set_missing: u64,
    pub inconsistent_alleles: u64,
}

/// What to do with one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    Keep,
    Rewrite(Vec<String>),
    Drop,
}

#[derive(Debug, Default)]
pub struct AlleleCleaner {
    stats: CleanStats,
}

impl AlleleCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CleanStats {
        self.stats
    }

    /// Cleans one record in place. `genotypes` are only touched for `RecordAction::Rewrite`.
    pub fn clean_record<S: AsRef<str>>(
        &mut self,
        position: u64,
        alts: &[S],
        genotypes: &mut [Genotype],
    ) -> RecordAction {
        self.stats.records_seen += 1;
        let Some((kept, index_map)) = AlleleIndexMap::from_alts(alts) else {
            return RecordAction::Keep;
        };
        self.stats.n_alleles_removed += (alts.len() - kept.len()) as u64;

        if kept.is_empty() {
            log::trace!("Record at {position} only carries no-data alleles, dropping");
            self.stats.records_dropped += 1;
            return RecordAction::Drop;
        }

        for genotype in genotypes.iter_mut() {
            let remapped = self.remap_genotype(position, genotype, &index_map);
            if remapped != *genotype {
                self.stats.genotypes_changed += 1;
                if remapped.is_missing() && !genotype.is_missing() {
                    self.stats.genotypes_set_missing += 1;
                }
                *genotype = remapped;
            }
        }
        self.stats.records_remapped += 1;
        RecordAction::Rewrite(kept)
    }

    /// Applies [`Self::clean_record`] to an assembled row, returning `None` for dropped rows.
    pub fn clean_row(&mut self, mut row: JointRow) -> Option<JointRow> {
        match self.clean_record(row.position, &row.alt_alleles, &mut row.genotypes) {
            RecordAction::Keep => Some(row),
            RecordAction::Rewrite(alts) => {
                row.alt_alleles = alts;
                Some(row)
            }
            RecordAction::Drop => None,
        }
    }

    fn remap_genotype(
        &mut self,
        position: u64,
        genotype: &Genotype,
        index_map: &AlleleIndexMap,
    ) -> Genotype {
        let mut all_no_data = !genotype.alleles.is_empty();
        let alleles: Vec<Option<u32>> = genotype
            .alleles
            .iter()
            .map(|allele| {
                let Some(index) = *allele else {
                    all_no_data = false;
                    return None;
                };
                match index_map.map(index) {
                    Ok(Some(mapped)) => {
                        all_no_data = false;
                        Some(mapped)
                    }
                    Ok(None) => None,
                    Err(()) => {
                        let err = WgaError::InconsistentGenotype {
                            position,
                            index,
                            n_alleles: index_map.n_alleles(),
                        };
                        log::warn!("{err}, setting allele to missing");
                        self.stats.inconsistent_alleles += 1;
                        all_no_data = false;
                        None
                    }
                }
            })
            .collect();

        if all_no_data {
            // The whole call was a no-data call
            return Genotype::missing(alleles.len());
        }
        Genotype::new(alleles, genotype.phased)
    }
}
