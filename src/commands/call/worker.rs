use crate::{
    cli::SampleSpec,
    core::{
        call::SampleVariantSet, coverage::CoverageSet, gap_fill::fill_gaps,
        normalize::normalize_records, reference::ReferenceTable,
    },
    error::WgaError,
    io::{coords_reader::read_coords, diff_reader::read_diff_table},
    utils::util::Result,
};
use crossbeam_channel::Sender;
use std::thread;

use super::progress::{send_progress_event, ProgressEvent};

/// Per-sample counters reported in the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub diff_records: usize,
    pub malformed_rows: usize,
    pub empty_rows: usize,
    pub collisions: usize,
    pub variants: usize,
    pub gap_filled: usize,
    pub uncovered_bases: u64,
}

#[derive(Debug)]
pub struct SampleOutcome {
    pub calls: SampleVariantSet,
    pub stats: SampleStats,
}

/// Reads, normalizes and gap-fills one sample against the shared reference.
pub fn process_sample(sample: &SampleSpec, reference: &ReferenceTable) -> Result<SampleOutcome> {
    let current_thread = thread::current();
    let worker_name = current_thread.name().unwrap_or("unnamed");
    log::debug!("Worker [{worker_name}]: Processing sample {}", sample.name);

    let coords = read_coords(&sample.coords)?;
    if coords.reference_length != reference.len() {
        return Err(WgaError::ReferenceLengthMismatch {
            path: sample.coords.clone(),
            observed: coords.reference_length,
            expected: reference.len(),
        });
    }
    let coverage = CoverageSet::from_blocks(&coords.blocks, reference.len());
    log::debug!(
        "Worker [{worker_name}]: {} aligned blocks cover {} of {} bases for {}",
        coords.blocks.len(),
        reference.len() - coverage.uncovered_len(),
        reference.len(),
        sample.name
    );

    let diff = read_diff_table(&sample.snps)?;
    let diff_records = diff.records.len();
    let normalized = normalize_records(diff.records, &sample.name, reference)?;
    let variants = normalized.variants.len();
    let filled = fill_gaps(&sample.name, normalized.variants, &coverage, reference)?;

    let stats = SampleStats {
        diff_records,
        malformed_rows: coords.malformed + diff.malformed,
        empty_rows: diff.empty,
        collisions: normalized.collisions,
        variants,
        gap_filled: filled.gap_filled,
        uncovered_bases: coverage.uncovered_len(),
    };
    log::debug!(
        "Worker [{worker_name}]: Sample {} done: variants={} gap_filled={} collisions={}",
        sample.name,
        stats.variants,
        stats.gap_filled,
        stats.collisions
    );
    Ok(SampleOutcome {
        calls: filled.calls,
        stats,
    })
}

/// Runs [`process_sample`] and reports the outcome on the progress channel.
pub fn process_sample_with_progress(
    sample: &SampleSpec,
    reference: &ReferenceTable,
    progress_sender: Option<&Sender<ProgressEvent>>,
) -> Result<SampleOutcome> {
    let result = process_sample(sample, reference);
    let event = match result {
        Ok(_) => ProgressEvent::SampleCompleted {
            sample: sample.name.clone(),
        },
        Err(_) => ProgressEvent::SampleFailed {
            sample: sample.name.clone(),
        },
    };
    send_progress_event(progress_sender, event);
    result
}
