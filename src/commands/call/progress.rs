use crossbeam_channel::{Receiver, Sender};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::LevelFilter;
use std::time::Duration;

pub enum ProgressEvent {
    SampleCompleted { sample: String },
    SampleFailed { sample: String },
    MatrixBuilt { rows: u64 },
    RowsProcessed { rows: u64 },
}

pub fn compute_progress_enabled(
    force_progress: bool,
    disable_progress: bool,
    is_stderr_tty: bool,
    max_level: LevelFilter,
) -> bool {
    if disable_progress || !is_stderr_tty {
        return false;
    }
    if matches!(max_level, LevelFilter::Debug | LevelFilter::Trace) {
        return false;
    }
    if force_progress {
        return true;
    }
    matches!(
        max_level,
        LevelFilter::Info | LevelFilter::Warn | LevelFilter::Error
    )
}

pub fn send_progress_event(progress_sender: Option<&Sender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(sender) = progress_sender {
        if sender.send(event).is_err() {
            log::debug!("Progress channel receiver closed unexpectedly.");
        }
    }
}

fn sample_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>8} [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
        .expect("sample progress style must be valid")
        .progress_chars("=> ")
}

fn row_spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>8} {spinner} {msg}")
        .expect("row spinner style must be valid")
}

fn row_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>8} [{bar:40.green/blue}] {pos:>8}/{len:8} {msg}")
        .expect("row progress style must be valid")
        .progress_chars("=> ")
}

pub fn build_sample_progress_message(completed: u64, failed: u64) -> String {
    if failed == 0 {
        format!("done={completed}")
    } else {
        format!("done={completed} failed={failed}")
    }
}

pub fn run_progress_ui(progress_receiver: Receiver<ProgressEvent>, total_samples: u64) {
    let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(10));

    let sample_bar = multi.add(ProgressBar::new(total_samples));
    sample_bar.set_prefix("samples");
    sample_bar.set_style(sample_progress_style());
    sample_bar.set_message("reading");

    let row_bar = multi.add(ProgressBar::new_spinner());
    row_bar.set_prefix("rows");
    row_bar.set_style(row_spinner_style());
    row_bar.set_message("waiting for samples");
    row_bar.enable_steady_tick(Duration::from_millis(100));

    let mut completed = 0u64;
    let mut failed = 0u64;
    let mut processed = 0u64;

    for event in progress_receiver {
        match event {
            ProgressEvent::SampleCompleted { sample } => {
                completed += 1;
                sample_bar.inc(1);
                sample_bar.set_message(format!(
                    "{} last={sample}",
                    build_sample_progress_message(completed, failed)
                ));
            }
            ProgressEvent::SampleFailed { sample } => {
                failed += 1;
                sample_bar.inc(1);
                sample_bar.set_message(format!(
                    "{} last={sample}",
                    build_sample_progress_message(completed, failed)
                ));
            }
            ProgressEvent::MatrixBuilt { rows } => {
                sample_bar.finish_with_message(build_sample_progress_message(completed, failed));
                row_bar.set_style(row_progress_style());
                row_bar.set_length(rows);
                row_bar.set_position(0);
                row_bar.set_message("writing");
            }
            ProgressEvent::RowsProcessed { rows } => {
                processed += rows;
                row_bar.set_position(processed);
            }
        }
    }

    sample_bar.finish_with_message(build_sample_progress_message(completed, failed));
    row_bar.finish_with_message(format!("processed={processed}"));
    let _ = multi.clear();
}
