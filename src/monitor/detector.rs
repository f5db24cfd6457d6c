use std::{
    path::{Path, PathBuf},
    pin::pin,
};

use async_stream::try_stream;
use log::debug;
use tokio_stream::{Stream, StreamExt};

use crate::{error::Result, format::format_path, stats::Metrics};

use super::{EventKind, FilesystemEvent};

pub const BACKUP_SUFFIX: &str = ".unf";
pub const MARKER_SUFFIX: &str = ".json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DetectorState {
    #[default]
    Idle,
    AwaitingCompletionMarker {
        candidate: PathBuf,
    },
}

impl DetectorState {
    pub fn as_gauge(&self) -> u8 {
        match self {
            DetectorState::Idle => 0,
            DetectorState::AwaitingCompletionMarker { .. } => 1,
        }
    }
}

/// The controller creates the `.unf` file, writes it many times, then
/// rewrites its `.json` meta file. Anything else while waiting drops the
/// candidate.
#[derive(Debug, Default)]
pub struct Detector {
    state: DetectorState,
}

impl Detector {
    pub fn new() -> Self {
        Detector::default()
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn observe(&mut self, event: &FilesystemEvent) -> Option<PathBuf> {
        match std::mem::take(&mut self.state) {
            DetectorState::Idle => {
                if event.kind == EventKind::Created && is_backup(&event.path) {
                    debug!("backup {} created", format_path(&event.path));
                    self.state = DetectorState::AwaitingCompletionMarker {
                        candidate: event.path.clone(),
                    };
                }
                None
            }
            // the backup itself is still being written
            DetectorState::AwaitingCompletionMarker { candidate } if is_backup(&event.path) => {
                self.state = DetectorState::AwaitingCompletionMarker { candidate };
                None
            }
            DetectorState::AwaitingCompletionMarker { candidate } if is_marker(&event.path) => {
                debug!("backup {} complete", format_path(&candidate));
                Some(candidate)
            }
            DetectorState::AwaitingCompletionMarker { candidate } => {
                debug!(
                    "discarding {} after unexpected {} of {}",
                    format_path(&candidate),
                    event.kind,
                    format_path(&event.path)
                );
                None
            }
        }
    }
}

fn is_backup(path: &Path) -> bool {
    has_suffix(path, BACKUP_SUFFIX)
}

fn is_marker(path: &Path) -> bool {
    has_suffix(path, MARKER_SUFFIX)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.to_string_lossy().ends_with(suffix)
}

pub fn completions<S, M>(events: S, metrics: M) -> impl Stream<Item = Result<PathBuf>>
where
    S: Stream<Item = Result<FilesystemEvent>>,
    M: Metrics,
{
    // the first error ends the stream
    try_stream! {
        let mut detector = Detector::new();
        let mut events = pin!(events);
        while let Some(event) = events.try_next().await? {
            let completed = detector.observe(&event);
            metrics.detector_state(detector.state().as_gauge());
            if let Some(path) = completed {
                yield path;
            }
        }
    }
}
