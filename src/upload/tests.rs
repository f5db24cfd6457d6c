use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use tempfile::TempDir;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::Instant,
};

use crate::{
    error::{Error, Result},
    stats::Stats,
    storage::ObjectStore,
};

use super::{remote_key, Upload, Uploader};

const PREFIX: &str = "unifi/";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    deletes: Mutex<Vec<String>>,
    failing_puts: HashSet<String>,
    failing_deletes: HashSet<String>,
    stalled_puts: HashSet<String>,
}

impl MemoryStore {
    fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

impl ObjectStore for MemoryStore {
    async fn put<R>(&self, key: &str, mut body: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        if self.stalled_puts.contains(key) {
            std::future::pending::<()>().await;
        }

        let mut bytes = vec![];
        body.read_to_end(&mut bytes).await?;
        if self.failing_puts.contains(key) {
            return Err(Error::Sdk(format!("put of {key} refused")));
        }

        self.objects.lock().unwrap().insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_owned());
        if self.failing_deletes.contains(key) {
            return Err(Error::Sdk(format!("delete of {key} refused")));
        }

        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    stats: Arc<Stats>,
    uploader: Uploader<MemoryStore, Arc<Stats>>,
}

impl Fixture {
    fn new(store: MemoryStore) -> Self {
        let stats = Arc::new(Stats::new());
        Fixture {
            dir: tempfile::tempdir().unwrap(),
            uploader: Uploader::new(store, PREFIX, stats.clone()),
            stats,
        }
    }

    fn backup(&self, name: &str, size: usize) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, vec![0xab; size]).unwrap();
        path
    }

    async fn upload(&mut self, path: &Path) -> Result<Upload> {
        self.uploader.upload(path, Instant::now() + TIMEOUT).await
    }
}

fn key(name: &str) -> String {
    format!("{PREFIX}{name}")
}

fn store_failing_puts(names: &[&str]) -> MemoryStore {
    MemoryStore {
        failing_puts: names.iter().map(|name| key(name)).collect(),
        ..MemoryStore::default()
    }
}

#[test]
fn remote_key_is_prefix_and_base_name() {
    let path = PathBuf::from(
        "/var/lib/unifi/backup/autobackup/autobackup_7.1.66_20220702_2025_1656793500051.unf",
    );
    assert_eq!(
        remote_key("unifi/", &path),
        "unifi/autobackup_7.1.66_20220702_2025_1656793500051.unf"
    );
    assert_eq!(remote_key("", &path), "autobackup_7.1.66_20220702_2025_1656793500051.unf");
    assert_eq!(remote_key("backups-", Path::new("a.unf")), "backups-a.unf");
}

#[tokio::test]
async fn first_upload_deletes_nothing() {
    let mut fixture = Fixture::new(MemoryStore::default());
    let a = fixture.backup("a.unf", 10);

    let upload = fixture.upload(&a).await.unwrap();

    assert_eq!(upload.key, key("a.unf"));
    assert_eq!(fixture.uploader.retained_key(), Some(key("a.unf").as_str()));
    assert!(fixture.uploader.store().deletes().is_empty());
    assert_eq!(fixture.stats.summary().delete_attempts, 0);
}

#[tokio::test]
async fn each_upload_retires_the_previous_one() {
    let mut fixture = Fixture::new(MemoryStore::default());
    let a = fixture.backup("a.unf", 10);
    let b = fixture.backup("b.unf", 20);
    let c = fixture.backup("c.unf", 30);

    fixture.upload(&a).await.unwrap();
    fixture.upload(&b).await.unwrap();
    assert_eq!(fixture.uploader.store().deletes(), vec![key("a.unf")]);

    fixture.upload(&c).await.unwrap();
    assert_eq!(
        fixture.uploader.store().deletes(),
        vec![key("a.unf"), key("b.unf")]
    );
    assert_eq!(fixture.uploader.store().keys(), vec![key("c.unf")]);
    assert_eq!(fixture.uploader.retained_key(), Some(key("c.unf").as_str()));

    let summary = fixture.stats.summary();
    assert_eq!(summary.upload_attempts, 3);
    assert_eq!(summary.upload_failures, 0);
    assert_eq!(summary.delete_attempts, 2);
    assert_eq!(summary.uploaded_bytes, 60);
}

#[tokio::test]
async fn failed_upload_keeps_retained_key() {
    let mut fixture = Fixture::new(store_failing_puts(&["b.unf"]));
    let a = fixture.backup("a.unf", 10);
    let b = fixture.backup("b.unf", 10);
    let c = fixture.backup("c.unf", 10);

    fixture.upload(&a).await.unwrap();
    assert!(matches!(fixture.upload(&b).await, Err(Error::Sdk(_))));
    assert_eq!(fixture.uploader.retained_key(), Some(key("a.unf").as_str()));
    assert!(fixture.uploader.store().deletes().is_empty());

    fixture.upload(&c).await.unwrap();
    assert_eq!(fixture.uploader.store().deletes(), vec![key("a.unf")]);
    assert_eq!(fixture.uploader.retained_key(), Some(key("c.unf").as_str()));

    let summary = fixture.stats.summary();
    assert_eq!(summary.upload_attempts, 3);
    assert_eq!(summary.upload_failures, 1);
    assert_eq!(summary.uploaded_bytes, 20);
}

#[tokio::test]
async fn same_name_uploaded_twice_is_kept() {
    let mut fixture = Fixture::new(MemoryStore::default());
    let a = fixture.backup("a.unf", 10);

    fixture.upload(&a).await.unwrap();
    fixture.upload(&a).await.unwrap();

    assert!(fixture.uploader.store().deletes().is_empty());
    assert_eq!(fixture.uploader.store().keys(), vec![key("a.unf")]);
    assert_eq!(fixture.uploader.retained_key(), Some(key("a.unf").as_str()));
    assert_eq!(fixture.stats.summary().delete_attempts, 0);

    let b = fixture.backup("b.unf", 10);
    fixture.upload(&b).await.unwrap();
    assert_eq!(fixture.uploader.store().deletes(), vec![key("a.unf")]);
}

#[tokio::test]
async fn reports_exact_byte_count() {
    let mut fixture = Fixture::new(MemoryStore::default());
    let size = 3 * 1024 * 1024 + 17;
    let a = fixture.backup("a.unf", size);

    let upload = fixture.upload(&a).await.unwrap();

    assert_eq!(upload.bytes, size as u64);
    assert_eq!(fixture.stats.summary().uploaded_bytes, size as u64);
}

#[tokio::test]
async fn empty_backup_is_uploaded() {
    let mut fixture = Fixture::new(MemoryStore::default());
    let a = fixture.backup("a.unf", 0);

    let upload = fixture.upload(&a).await.unwrap();

    assert_eq!(upload.bytes, 0);
    assert_eq!(fixture.uploader.store().keys(), vec![key("a.unf")]);
}

#[tokio::test]
async fn failed_delete_does_not_fail_upload() {
    let store = MemoryStore {
        failing_deletes: HashSet::from([key("a.unf")]),
        ..MemoryStore::default()
    };
    let mut fixture = Fixture::new(store);
    let a = fixture.backup("a.unf", 10);
    let b = fixture.backup("b.unf", 10);
    let c = fixture.backup("c.unf", 10);

    fixture.upload(&a).await.unwrap();
    let upload = fixture.upload(&b).await.unwrap();
    assert_eq!(upload.key, key("b.unf"));
    assert_eq!(fixture.uploader.retained_key(), Some(key("b.unf").as_str()));

    // a is never retried; b is next in line
    fixture.upload(&c).await.unwrap();
    assert_eq!(
        fixture.uploader.store().deletes(),
        vec![key("a.unf"), key("b.unf")]
    );
    assert_eq!(
        fixture.uploader.store().keys(),
        vec![key("a.unf"), key("c.unf")]
    );

    let summary = fixture.stats.summary();
    assert_eq!(summary.delete_attempts, 2);
    assert_eq!(summary.delete_failures, 1);
    assert_eq!(summary.upload_failures, 0);
}

#[tokio::test]
async fn missing_file_fails_without_touching_store() {
    let mut fixture = Fixture::new(MemoryStore::default());
    let a = fixture.backup("a.unf", 10);
    let missing = fixture.dir.path().join("missing.unf");

    fixture.upload(&a).await.unwrap();
    let result = fixture.upload(&missing).await;

    assert!(matches!(result, Err(Error::OpenBackup { .. })));
    assert_eq!(fixture.uploader.retained_key(), Some(key("a.unf").as_str()));
    assert_eq!(fixture.uploader.store().keys(), vec![key("a.unf")]);
    assert_eq!(fixture.stats.summary().upload_failures, 1);
}

#[tokio::test]
async fn deadline_aborts_upload() {
    let store = MemoryStore {
        stalled_puts: HashSet::from([key("b.unf")]),
        ..MemoryStore::default()
    };
    let mut fixture = Fixture::new(store);
    let a = fixture.backup("a.unf", 10);
    let b = fixture.backup("b.unf", 10);

    fixture.upload(&a).await.unwrap();
    let deadline = Instant::now() + Duration::from_millis(50);
    let result = fixture.uploader.upload(&b, deadline).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(fixture.uploader.retained_key(), Some(key("a.unf").as_str()));
    assert!(fixture.uploader.store().deletes().is_empty());
    assert_eq!(fixture.stats.summary().upload_failures, 1);
}
