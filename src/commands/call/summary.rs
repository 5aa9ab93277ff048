use crate::{
    core::{allele_cleaner::CleanStats, matrix::MatrixStats},
    utils::util::format_number_with_commas,
};

use super::worker::SampleStats;

/// Counters accumulated over one `call` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub samples_processed: usize,
    pub samples_failed: usize,
    pub sample_stats: SampleStats,
    pub matrix: MatrixStats,
    pub rows_written: u64,
    pub clean: Option<CleanStats>,
}

impl RunSummary {
    pub fn add_sample(&mut self, stats: &SampleStats) {
        self.samples_processed += 1;
        let total = &mut self.sample_stats;
        total.diff_records += stats.diff_records;
        total.malformed_rows += stats.malformed_rows;
        total.empty_rows += stats.empty_rows;
        total.collisions += stats.collisions;
        total.variants += stats.variants;
        total.gap_filled += stats.gap_filled;
        total.uncovered_bases += stats.uncovered_bases;
    }

    pub fn log(&self) {
        let s = &self.sample_stats;
        log::info!(
            "Samples: {} processed, {} failed",
            format_number_with_commas(self.samples_processed),
            format_number_with_commas(self.samples_failed)
        );
        log::info!(
            "Diff rows: {} read, {} malformed, {} empty",
            format_number_with_commas(s.diff_records),
            format_number_with_commas(s.malformed_rows),
            format_number_with_commas(s.empty_rows)
        );
        log::info!(
            "Variants: {} normalized, {} anchor collisions dropped, {} no-data calls from {} uncovered bases",
            format_number_with_commas(s.variants),
            format_number_with_commas(s.collisions),
            format_number_with_commas(s.gap_filled),
            format_number_with_commas(s.uncovered_bases)
        );
        if self.matrix.conflicting_ref_positions > 0 || self.matrix.ref_mismatches > 0 {
            log::warn!(
                "Positions with conflicting REF alleles: {}, REF mismatches against the reference: {}",
                format_number_with_commas(self.matrix.conflicting_ref_positions),
                format_number_with_commas(self.matrix.ref_mismatches)
            );
        }
        if let Some(clean) = &self.clean {
            log::info!(
                "Cleaning: {} no-data alleles removed, {} rows dropped, {} genotypes remapped, {} set to missing",
                format_number_with_commas(clean.n_alleles_removed),
                format_number_with_commas(clean.records_dropped),
                format_number_with_commas(clean.genotypes_changed),
                format_number_with_commas(clean.genotypes_set_missing)
            );
            if clean.inconsistent_alleles > 0 {
                log::warn!(
                    "Genotype allele indexes out of range: {}",
                    format_number_with_commas(clean.inconsistent_alleles)
                );
            }
        }
        log::info!(
            "Rows: {} assembled, {} written",
            format_number_with_commas(self.matrix.rows),
            format_number_with_commas(self.rows_written)
        );
    }
}
