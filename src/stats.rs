use std::{
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};

use crate::monitor::EventKind;

pub trait Metrics {
    fn fs_event(&self, _kind: EventKind) {}
    fn fs_error(&self) {}
    fn detector_state(&self, _state: u8) {}

    fn upload_attempt(&self) {}
    fn upload_failure(&self) {}
    fn delete_attempt(&self) {}
    fn delete_failure(&self) {}
    fn uploaded(&self, _bytes: u64, _elapsed: Duration) {}

    fn backup_succeeded(&self, _at: DateTime<Utc>) {}
    fn backup_failed(&self) {}
}

impl<M: Metrics + ?Sized> Metrics for Arc<M> {
    fn fs_event(&self, kind: EventKind) {
        (**self).fs_event(kind);
    }

    fn fs_error(&self) {
        (**self).fs_error();
    }

    fn detector_state(&self, state: u8) {
        (**self).detector_state(state);
    }

    fn upload_attempt(&self) {
        (**self).upload_attempt();
    }

    fn upload_failure(&self) {
        (**self).upload_failure();
    }

    fn delete_attempt(&self) {
        (**self).delete_attempt();
    }

    fn delete_failure(&self) {
        (**self).delete_failure();
    }

    fn uploaded(&self, bytes: u64, elapsed: Duration) {
        (**self).uploaded(bytes, elapsed);
    }

    fn backup_succeeded(&self, at: DateTime<Utc>) {
        (**self).backup_succeeded(at);
    }

    fn backup_failed(&self) {
        (**self).backup_failed();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

impl Metrics for NoMetrics {}

#[derive(Debug, Default)]
pub struct Stats {
    events: [AtomicU64; EventKind::COUNT],
    fs_errors: AtomicU64,
    detector_state: AtomicU8,
    upload_attempts: AtomicU64,
    upload_failures: AtomicU64,
    delete_attempts: AtomicU64,
    delete_failures: AtomicU64,
    uploaded_bytes: AtomicU64,
    last_upload_millis: AtomicU64,
    backup_failures: AtomicU64,
    last_success_millis: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub events: [u64; EventKind::COUNT],
    pub fs_errors: u64,
    pub detector_state: u8,
    pub upload_attempts: u64,
    pub upload_failures: u64,
    pub delete_attempts: u64,
    pub delete_failures: u64,
    pub uploaded_bytes: u64,
    pub last_upload_duration: Duration,
    pub backup_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    pub fn summary(&self) -> Summary {
        let last_success_millis = self.last_success_millis.load(Ordering::Relaxed);
        let last_success = match i64::try_from(last_success_millis) {
            Ok(millis) if millis > 0 => DateTime::from_timestamp_millis(millis),
            _ => None,
        };

        Summary {
            events: self.events.each_ref().map(|n| n.load(Ordering::Relaxed)),
            fs_errors: self.fs_errors.load(Ordering::Relaxed),
            detector_state: self.detector_state.load(Ordering::Relaxed),
            upload_attempts: self.upload_attempts.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
            delete_attempts: self.delete_attempts.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            uploaded_bytes: self.uploaded_bytes.load(Ordering::Relaxed),
            last_upload_duration: Duration::from_millis(
                self.last_upload_millis.load(Ordering::Relaxed),
            ),
            backup_failures: self.backup_failures.load(Ordering::Relaxed),
            last_success,
        }
    }
}

impl Metrics for Stats {
    fn fs_event(&self, kind: EventKind) {
        self.events[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn fs_error(&self) {
        self.fs_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn detector_state(&self, state: u8) {
        self.detector_state.store(state, Ordering::Relaxed);
    }

    fn upload_attempt(&self) {
        self.upload_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn upload_failure(&self) {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn delete_attempt(&self) {
        self.delete_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn delete_failure(&self) {
        self.delete_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn uploaded(&self, bytes: u64, elapsed: Duration) {
        self.uploaded_bytes.fetch_add(bytes, Ordering::Relaxed);
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.last_upload_millis.store(millis, Ordering::Relaxed);
    }

    fn backup_succeeded(&self, at: DateTime<Utc>) {
        let millis = u64::try_from(at.timestamp_millis()).unwrap_or_default();
        self.last_success_millis.store(millis, Ordering::Relaxed);
    }

    fn backup_failed(&self) {
        self.backup_failures.fetch_add(1, Ordering::Relaxed);
    }
}
