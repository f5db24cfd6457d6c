use std::path::Path;

use log::{debug, trace, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    error::{Error, Result},
    format::format_path,
    stats::Metrics,
};

use super::FilesystemEvent;

/// Raw events arriving while the buffer is full are dropped.
pub const EVENT_BUFFER: usize = 1024;

type EventSender = mpsc::Sender<Result<FilesystemEvent>>;

// dropping the watcher ends the stream
pub fn watch<M>(
    dir: &Path,
    metrics: M,
) -> Result<(RecommendedWatcher, ReceiverStream<Result<FilesystemEvent>>)>
where
    M: Metrics + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
    let setup_error = |source| Error::WatchSetup {
        path: dir.to_owned(),
        source,
    };

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                for event in FilesystemEvent::from_notify(event) {
                    trace!("{} {}", event.kind, format_path(&event.path));
                    metrics.fs_event(event.kind);
                    forward_event(&sender, event);
                }
            }
            Err(err) => {
                metrics.fs_error();
                forward_error(&sender, err.into());
            }
        }
    })
    .map_err(setup_error)?;

    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(setup_error)?;

    Ok((watcher, ReceiverStream::new(receiver)))
}

fn forward_event(sender: &EventSender, event: FilesystemEvent) {
    match sender.try_send(Ok(event)) {
        Ok(()) | Err(TrySendError::Closed(_)) => {}
        Err(TrySendError::Full(item)) => {
            if let Ok(event) = item {
                warn!(
                    "event buffer full, dropped {} of {}",
                    event.kind,
                    format_path(&event.path)
                );
            }
        }
    }
}

/// Errors end the monitor, so they wait for room instead of being dropped.
/// Runs on the watcher's own thread, never on a runtime worker.
fn forward_error(sender: &EventSender, err: Error) {
    if sender.blocking_send(Err(err)).is_err() {
        debug!("monitor error after receiver closed");
    }
}
