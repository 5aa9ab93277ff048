use crate::utils::util::Result;
use crossbeam_channel::Sender;
use std::{any::Any, thread};

use super::progress::ProgressEvent;

fn panic_payload_message(panic_payload: &(dyn Any + Send + 'static)) -> String {
    if let Some(message) = panic_payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = panic_payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic payload".to_owned()
}

fn join_progress_thread_result(handle: thread::JoinHandle<()>) -> Result<()> {
    handle.join().map_err(|panic_payload| {
        crate::wga_error!(
            "Progress thread panicked: {}",
            panic_payload_message(panic_payload.as_ref())
        )
    })
}

/// Closes the progress channel and waits for the UI thread to drain it.
pub(crate) fn finalize_progress(
    progress_sender: Option<Sender<ProgressEvent>>,
    progress_thread: Option<thread::JoinHandle<()>>,
) -> Result<()> {
    drop(progress_sender);
    match progress_thread {
        Some(handle) => join_progress_thread_result(handle).inspect_err(|_| {
            log::debug!("Progress thread terminated unexpectedly.");
        }),
        None => Ok(()),
    }
}
