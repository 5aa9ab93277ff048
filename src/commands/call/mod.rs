use crate::{
    cli::{CallArgs, SampleSpec},
    core::{
        allele_cleaner::AlleleCleaner,
        matrix::{VariantMatrix, VariantMatrixBuilder},
        reference::ReferenceTable,
    },
    io::{
        reference_reader::load_reference,
        vcf_writer::{create_output_header, VcfWriter},
    },
    utils::util::Result,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::{prelude::*, ThreadPoolBuilder};
use std::{
    collections::{BTreeSet, HashSet},
    io::{self, IsTerminal},
    path::Path,
    thread,
};

mod progress;
mod shutdown;
mod summary;
mod worker;

pub use summary::RunSummary;
pub use worker::{process_sample, SampleOutcome, SampleStats};

use progress::{compute_progress_enabled, run_progress_ui, send_progress_event, ProgressEvent};
use shutdown::finalize_progress;
use worker::process_sample_with_progress;


const ROW_PROGRESS_BATCH: u64 = 4096;

fn check_unique_sample_names(samples: &[SampleSpec]) -> Result<()> {
    let mut seen = HashSet::with_capacity(samples.len());
    for sample in samples {
        if !seen.insert(sample.name.as_str()) {
            return Err(crate::wga_error!(
                "Sample name {} is used more than once",
                sample.name
            ));
        }
    }
    Ok(())
}

/// Picks the output contig name: an explicit request wins, then the reference tag shared by
/// all samples, then the reference's own name.
pub fn resolve_contig(
    requested: Option<&str>,
    sample_tags: &[Option<&str>],
    reference_name: &str,
) -> Result<String> {
    if let Some(contig) = requested {
        return Ok(contig.to_string());
    }
    let tags: BTreeSet<&str> = sample_tags.iter().flatten().copied().collect();
    match tags.len() {
        0 => Ok(reference_name.to_string()),
        1 => Ok(tags.into_iter().next().unwrap_or(reference_name).to_string()),
        _ => Err(crate::wga_error!(
            "Samples were aligned against different reference sequences ({}), use --contig to name the output contig",
            tags.into_iter().collect::<Vec<_>>().join(", ")
        )),
    }
}

/// Processes every sample on the worker pool. Failed samples are logged and left out.
fn collect_samples<'a>(
    samples: &[SampleSpec],
    reference: &'a ReferenceTable,
    args: &CallArgs,
    progress_sender: Option<&Sender<ProgressEvent>>,
    summary: &mut RunSummary,
) -> Result<VariantMatrixBuilder<'a>> {
    log::debug!(
        "Initializing call thread pool with {} threads...",
        args.num_threads
    );
    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .thread_name(|i| format!("wgavcf-call-{i}"))
        .build()
        .map_err(|e| crate::wga_error!("Failed to initialize call thread pool: {e}"))?;

    let results: Vec<(&SampleSpec, Result<SampleOutcome>)> = pool.install(|| {
        samples
            .par_iter()
            .map_with(progress_sender.cloned(), |sender, sample| {
                (
                    sample,
                    process_sample_with_progress(sample, reference, sender.as_ref()),
                )
            })
            .collect()
    });

    let mut sample_tags = Vec::with_capacity(results.len());
    let mut sets = Vec::with_capacity(results.len());
    for (sample, result) in results {
        match result {
            Ok(outcome) => {
                summary.add_sample(&outcome.stats);
                sample_tags.push(outcome.calls.reference_tag.clone());
                sets.push(outcome.calls);
            }
            Err(e) => {
                log::error!("Sample {} failed and is left out: {e}", sample.name);
                summary.samples_failed += 1;
            }
        }
    }
    if sets.is_empty() {
        return Err(crate::wga_error!(
            "None of the {} samples could be processed",
            samples.len()
        ));
    }

    let tags: Vec<Option<&str>> = sample_tags.iter().map(Option::as_deref).collect();
    let contig = resolve_contig(args.contig.as_deref(), &tags, reference.name())?;
    log::debug!("Output contig: {contig}");

    let mut builder = VariantMatrixBuilder::new(contig, reference);
    for set in sets {
        builder.add_sample(set);
    }
    Ok(builder)
}

fn write_matrix(
    matrix: VariantMatrix,
    args: &CallArgs,
    progress_sender: Option<&Sender<ProgressEvent>>,
    summary: &mut RunSummary,
) -> Result<()> {
    let header = create_output_header(
        &matrix.contig,
        matrix.reference_length,
        &matrix.samples,
        args.no_version,
    );
    let mut writer = VcfWriter::new(&header, args.output.as_deref().map(Path::new))?;
    let rid = writer.contig_rid(&matrix.contig)?;
    let mut cleaner = args.clean.then(AlleleCleaner::new);

    let mut pending = 0u64;
    for row in matrix.rows {
        pending += 1;
        if pending == ROW_PROGRESS_BATCH {
            send_progress_event(progress_sender, ProgressEvent::RowsProcessed { rows: pending });
            pending = 0;
        }
        let row = match cleaner.as_mut() {
            Some(cleaner) => match cleaner.clean_row(row) {
                Some(row) => row,
                None => continue,
            },
            None => row,
        };
        writer.write_row(rid, &row)?;
    }
    send_progress_event(progress_sender, ProgressEvent::RowsProcessed { rows: pending });

    summary.rows_written = writer.rows_written();
    summary.clean = cleaner.map(|cleaner| cleaner.stats());
    Ok(())
}

fn run_samples(
    samples: &[SampleSpec],
    reference: &ReferenceTable,
    args: &CallArgs,
    progress_sender: Option<&Sender<ProgressEvent>>,
    summary: &mut RunSummary,
) -> Result<()> {
    let builder = collect_samples(samples, reference, args, progress_sender, summary)?;
    let (matrix, matrix_stats) = builder.build()?;
    summary.matrix = matrix_stats;
    send_progress_event(
        progress_sender,
        ProgressEvent::MatrixBuilt {
            rows: matrix.rows.len() as u64,
        },
    );
    write_matrix(matrix, args, progress_sender, summary)
}

pub fn call(args: CallArgs) -> Result<()> {
    let samples = args
        .process_samples()
        .map_err(|error| crate::wga_error!("{error}"))?;
    check_unique_sample_names(&samples)?;
    log::info!("Calling variants for {} samples", samples.len());

    let reference = load_reference(&args.reference, args.sequence.as_deref())?;
    log::info!(
        "Reference {}: {} bases",
        reference.name(),
        reference.len()
    );

    let progress_enabled = compute_progress_enabled(
        args.progress,
        args.no_progress,
        io::stderr().is_terminal(),
        log::max_level(),
    );
    let total_samples = samples.len() as u64;
    let mut progress_thread = None;
    let progress_sender = if progress_enabled {
        let (sender, receiver): (Sender<ProgressEvent>, Receiver<ProgressEvent>) = unbounded();
        progress_thread = Some(thread::spawn(move || {
            run_progress_ui(receiver, total_samples);
        }));
        Some(sender)
    } else {
        None
    };

    let mut summary = RunSummary::default();
    let run_result = run_samples(
        &samples,
        &reference,
        &args,
        progress_sender.as_ref(),
        &mut summary,
    );

    let shutdown_result = finalize_progress(progress_sender, progress_thread);
    run_result?;
    shutdown_result?;

    summary.log();
    Ok(())
}
