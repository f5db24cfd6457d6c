//! The controller only finds autobackups listed in `autobackup_meta.json`.

mod file;
mod meta;

use std::path::Path;

use log::info;
use tokio::fs;

use crate::{
    error::{Error, Result},
    format::format_path,
    monitor::BACKUP_SUFFIX,
};

pub use self::{file::BackupFile, meta::MetaFile};

pub const META_FILE_NAME: &str = "autobackup_meta.json";

pub async fn genmeta(dir: &Path) -> Result<MetaFile> {
    let mut files = vec![];
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(BACKUP_SUFFIX) {
            return Err(Error::NotABackup(name));
        }

        let metadata = entry.metadata().await?;
        files.push(BackupFile::parse(&name, metadata.len())?);
    }

    let meta = MetaFile::new(files);
    let mut contents = serde_json::to_vec(&meta)?;
    contents.push(b'\n');

    let path = dir.join(META_FILE_NAME);
    fs::write(&path, contents).await?;
    info!(
        "wrote {} backups to {}",
        meta.files().len(),
        format_path(&path)
    );
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_meta_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path()
                .join("autobackup_7.1.66_20220702_2025_1656793500051.unf"),
            vec![0; 100],
        )
        .unwrap();

        let meta = genmeta(dir.path()).await.unwrap();
        assert_eq!(meta.files().len(), 1);

        let contents = std::fs::read_to_string(dir.path().join(META_FILE_NAME)).unwrap();
        assert_eq!(
            contents,
            concat!(
                r#"{"autobackup_7.1.66_20220702_2025_1656793500051.unf":"#,
                r#"{"version":"7.1.66","time":1656793500051,"datetime":"2022-07-02T20:25:00Z","#,
                r#""format":"bson","days":-1,"size":100}}"#,
                "\n"
            )
        );
    }

    #[tokio::test]
    async fn empty_directory_gives_empty_meta() {
        let dir = tempfile::tempdir().unwrap();
        genmeta(dir.path()).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join(META_FILE_NAME)).unwrap();
        assert_eq!(contents, "{}\n");
    }

    #[tokio::test]
    async fn rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let result = genmeta(dir.path()).await;
        assert!(matches!(result, Err(Error::NotABackup(name)) if name == "notes.txt"));
        assert!(!dir.path().join(META_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn rejects_malformed_backup_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manual.unf"), "hi").unwrap();

        let result = genmeta(dir.path()).await;
        assert!(matches!(result, Err(Error::InvalidBackupName(_))));
    }
}
