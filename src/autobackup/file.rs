use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"autobackup_([\d.]+)_\d{8}_\d{4}_(\d+)\.unf").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub controller_version: String,
    pub initiated: DateTime<Utc>,
    pub size_bytes: u64,
}

impl BackupFile {
    /// Parses a backup file name such as
    /// `autobackup_7.1.66_20220702_2025_1656793500051.unf`. Only the version
    /// and the trailing millisecond timestamp are significant.
    pub fn parse(name: &str, size_bytes: u64) -> Result<Self> {
        let captures = NAME_REGEX
            .captures(name)
            .ok_or_else(|| Error::InvalidBackupName(name.to_owned()))?;

        let millis: i64 = captures[2]
            .parse()
            .map_err(|_| Error::InvalidBackupName(name.to_owned()))?;
        let initiated =
            DateTime::from_timestamp_millis(millis).ok_or(Error::InvalidTimestamp(millis))?;

        Ok(BackupFile {
            controller_version: captures[1].to_owned(),
            initiated,
            size_bytes,
        })
    }

    pub fn name(&self) -> String {
        format!(
            "autobackup_{}_{}_{}.unf",
            self.controller_version,
            self.initiated.format("%Y%m%d_%H%M"),
            self.initiated.timestamp_millis()
        )
    }
}

#[derive(Serialize)]
struct BackupFileJson<'a> {
    version: &'a str,
    time: i64,
    datetime: String,
    format: &'static str,
    days: i32,
    size: u64,
}

impl Serialize for BackupFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let json = BackupFileJson {
            version: &self.controller_version,
            time: self.initiated.timestamp_millis(),
            datetime: self.initiated.to_rfc3339_opts(SecondsFormat::Secs, true),
            format: "bson",
            days: -1,
            size: self.size_bytes,
        };
        json.serialize(serializer)
    }
}
