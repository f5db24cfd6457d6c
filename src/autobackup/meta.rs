use itertools::Itertools;
use serde::{ser::SerializeMap, Serialize, Serializer};

use super::BackupFile;

/// Contents of `autobackup_meta.json`: every backup keyed by file name,
/// oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFile {
    files: Vec<BackupFile>,
}

impl MetaFile {
    pub fn new<I: IntoIterator<Item = BackupFile>>(files: I) -> Self {
        let files = files
            .into_iter()
            .sorted_by_key(|file| file.initiated)
            .collect();
        MetaFile { files }
    }

    pub fn files(&self) -> &[BackupFile] {
        &self.files
    }
}

impl Serialize for MetaFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for file in &self.files {
            map.serialize_entry(&file.name(), file)?;
        }
        map.end()
    }
}
