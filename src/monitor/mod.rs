//! Identifies new backups as they become available, by watching the backup
//! directory and feeding its events through a small state machine.

mod detector;
mod event;
mod watch;

use std::{
    path::{Path, PathBuf},
    pin::pin,
};

use async_channel::{Receiver, Sender};
use log::debug;
use notify::RecommendedWatcher;
use tokio::{spawn, task::JoinHandle};
use tokio_stream::{Stream, StreamExt};

use crate::{error::Result, stats::Metrics};

pub use self::{
    detector::{completions, BACKUP_SUFFIX},
    event::{EventKind, FilesystemEvent},
};

// one completion waits while the previous one uploads
const HANDOFF_CAPACITY: usize = 1;

pub struct Monitor {
    watcher: Option<RecommendedWatcher>,
    task: JoinHandle<()>,
    backups: Receiver<Result<PathBuf>>,
}

impl Monitor {
    pub fn new<M>(dir: &Path, metrics: M) -> Result<Self>
    where
        M: Metrics + Clone + Send + Sync + 'static,
    {
        let (watcher, events) = watch::watch(dir, metrics.clone())?;
        let (sender, backups) = async_channel::bounded(HANDOFF_CAPACITY);
        let task = spawn(forward_completions(events, sender, metrics));

        Ok(Monitor {
            watcher: Some(watcher),
            task,
            backups,
        })
    }

    pub fn backups(&self) -> Receiver<Result<PathBuf>> {
        self.backups.clone()
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.watcher.take().is_some() {
            self.task.abort();
            self.backups.close();
            debug!("monitor closed");
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn forward_completions<S, M>(events: S, sender: Sender<Result<PathBuf>>, metrics: M)
where
    S: Stream<Item = Result<FilesystemEvent>>,
    M: Metrics,
{
    let mut completed = pin!(completions(events, metrics));
    while let Some(item) = completed.next().await {
        let failed = item.is_err();
        if sender.send(item).await.is_err() || failed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc, time::Duration};

    use tokio::time::timeout;

    use crate::{error::Error, stats::Stats};

    use super::*;

    const WAIT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn detects_backup_written_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(Stats::new());
        let monitor = Monitor::new(dir.path(), stats.clone()).unwrap();
        let backups = monitor.backups();

        let backup = dir.path().join("autobackup_7.1.66_20220702_2025_1656793500051.unf");
        fs::write(&backup, vec![7; 4096]).unwrap();
        fs::write(dir.path().join("autobackup_meta.json"), b"{}").unwrap();

        let received = timeout(WAIT, backups.recv()).await.unwrap().unwrap();
        assert_eq!(received.unwrap(), backup);
        assert!(stats.summary().events[EventKind::Created.index()] >= 2);

        monitor.close();
        assert!(backups.recv().await.is_err());
    }

    #[tokio::test]
    async fn watching_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let result = Monitor::new(&missing, Arc::new(Stats::new()));
        assert!(matches!(result, Err(Error::WatchSetup { .. })));
    }

    #[tokio::test]
    async fn source_error_is_forwarded_then_channel_closes() {
        let events = tokio_stream::iter(vec![
            Ok(FilesystemEvent::new("a.unf", EventKind::Created)),
            Ok(FilesystemEvent::new("meta.json", EventKind::Written)),
            Err(Error::MonitorStopped),
        ]);
        let (sender, receiver) = async_channel::bounded(HANDOFF_CAPACITY);
        let task = spawn(forward_completions(events, sender, Arc::new(Stats::new())));

        assert_eq!(receiver.recv().await.unwrap().unwrap(), PathBuf::from("a.unf"));
        assert!(matches!(
            receiver.recv().await.unwrap(),
            Err(Error::MonitorStopped)
        ));
        assert!(receiver.recv().await.is_err());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn handoff_blocks_until_received() {
        let events = tokio_stream::iter(vec![
            Ok(FilesystemEvent::new("a.unf", EventKind::Created)),
            Ok(FilesystemEvent::new("meta.json", EventKind::Written)),
            Ok(FilesystemEvent::new("b.unf", EventKind::Created)),
            Ok(FilesystemEvent::new("meta.json", EventKind::Written)),
        ]);
        let (sender, receiver) = async_channel::bounded(HANDOFF_CAPACITY);
        let task = spawn(forward_completions(events, sender, Arc::new(Stats::new())));

        tokio::task::yield_now().await;
        assert_eq!(receiver.len(), 1);
        assert!(!task.is_finished());

        assert_eq!(receiver.recv().await.unwrap().unwrap(), PathBuf::from("a.unf"));
        assert_eq!(receiver.recv().await.unwrap().unwrap(), PathBuf::from("b.unf"));
        task.await.unwrap();
        assert!(receiver.recv().await.is_err());
    }
}
