//! Ships completed backups to object storage, retiring the one shipped before.

mod counting;

#[cfg(test)]
mod tests;

use std::{path::Path, time::Duration};

use log::{debug, info, warn};
use tokio::{
    fs::File,
    time::{timeout_at, Instant},
};

use crate::{
    error::{Error, Result},
    format::{format_duration, format_path, format_size},
    stats::Metrics,
    storage::ObjectStore,
};

pub use self::counting::CountingReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub key: String,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Keeps one backup in the store: each successful upload deletes the object
/// written by the previous one. Objects this uploader did not write are never
/// touched.
#[derive(Debug)]
pub struct Uploader<S, M> {
    store: S,
    prefix: String,
    metrics: M,
    retained_key: Option<String>,
}

impl<S: ObjectStore, M: Metrics> Uploader<S, M> {
    pub fn new<P: Into<String>>(store: S, prefix: P, metrics: M) -> Self {
        Uploader {
            store,
            prefix: prefix.into(),
            metrics,
            retained_key: None,
        }
    }

    pub fn retained_key(&self) -> Option<&str> {
        self.retained_key.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn upload(&mut self, path: &Path, deadline: Instant) -> Result<Upload> {
        self.metrics.upload_attempt();
        let upload = match self.put(path, deadline).await {
            Ok(upload) => upload,
            Err(err) => {
                self.metrics.upload_failure();
                return Err(err);
            }
        };

        self.metrics.uploaded(upload.bytes, upload.elapsed);
        info!(
            "uploaded {} ({}) in {}",
            upload.key,
            format_size(upload.bytes),
            format_duration(upload.elapsed)
        );

        // delete the old backup only after the new one is safely stored
        if let Some(previous_key) = self.retained_key.as_deref() {
            if previous_key == upload.key {
                debug!("{previous_key} was overwritten in place");
            } else {
                self.retire(previous_key, deadline).await;
            }
        }

        self.retained_key = Some(upload.key.clone());
        Ok(upload)
    }

    async fn put(&self, path: &Path, deadline: Instant) -> Result<Upload> {
        let file = File::open(path).await.map_err(|source| Error::OpenBackup {
            path: path.to_owned(),
            source,
        })?;

        let key = remote_key(&self.prefix, path);
        let mut reader = CountingReader::new(file);
        debug!("uploading {} to {key}", format_path(path));

        let start = Instant::now();
        timeout_at(deadline, self.store.put(&key, &mut reader))
            .await
            .map_err(|_| Error::Timeout(round_millis(start.elapsed())))??;

        Ok(Upload {
            key,
            bytes: reader.bytes_read(),
            elapsed: start.elapsed(),
        })
    }

    async fn retire(&self, key: &str, deadline: Instant) {
        self.metrics.delete_attempt();
        let start = Instant::now();
        let result = match timeout_at(deadline, self.store.delete(key)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(round_millis(start.elapsed()))),
        };

        match result {
            Ok(()) => debug!("deleted {key}"),
            Err(err) => {
                // too many backups is a benign failure
                self.metrics.delete_failure();
                warn!("failed to delete {key}: {err}");
            }
        }
    }
}

pub fn remote_key(prefix: &str, path: &Path) -> String {
    let base_name = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy());
    format!("{prefix}{base_name}")
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
