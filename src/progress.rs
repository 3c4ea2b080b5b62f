//! Progress bar for the classification pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use twmtg_core::ClassifyProgress;

const POLL_INTERVAL: Duration = Duration::from_millis(120);

pub(crate) fn should_show_progress(
    stderr_is_terminal: bool,
    quiet: bool,
    no_progress: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !no_progress && !dumb_terminal
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

/// Spawns the progress bar task when `enabled`.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `enabled` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    enabled: bool,
    progress: ClassifyProgress,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !enabled {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_bar(progress, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_bar(progress: ClassifyProgress, stop: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("syncing snapshot...");
        bar.enable_steady_tick(Duration::from_millis(100));

        let mut counting = false;
        while !stop.load(Ordering::SeqCst) {
            let total = progress.total();
            if total > 0 && !counting {
                counting = true;
                bar.set_length(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner} classifying [{bar:40}] {pos}/{len} cards ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar.set_message("");
            }
            if counting {
                bar.set_position(progress.scanned().min(total));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        bar.finish_and_clear();
    })
}
