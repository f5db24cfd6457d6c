use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::{self, AsyncRead},
};

use crate::error::Result;

use super::ObjectStore;

const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        LocalStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for LocalStore {
    async fn put<R>(&self, key: &str, mut body: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = PartialFile::new(&path);
        let mut file = File::create(partial.path()).await?;
        io::copy(&mut body, &mut file).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(partial.path(), &path).await?;
        partial.persist();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        fs::remove_file(self.object_path(key)).await?;
        Ok(())
    }
}

/// Sibling file an object is written to before being renamed into place.
/// Removed on drop unless persisted.
struct PartialFile {
    path: PathBuf,
    persisted: bool,
}

impl PartialFile {
    fn new(target: &Path) -> Self {
        let mut name = target.file_name().map(OsString::from).unwrap_or_default();
        name.push(PARTIAL_SUFFIX);
        PartialFile {
            path: target.with_file_name(name),
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persist(mut self) {
        self.persisted = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
