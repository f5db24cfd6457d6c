use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Args};
use concolor_clap::ColorChoice;
use humantime::parse_duration;

const DEFAULT_DIR: &str = "/var/lib/unifi/backup/autobackup";
const DEFAULT_PREFIX: &str = "unifi/";
const DEFAULT_TIMEOUT: &str = "5m";

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Directory the controller writes autobackups to
    #[arg(short, long, env = "UNIFIBACKUP_DIR", default_value = DEFAULT_DIR)]
    pub dir: PathBuf,

    /// S3 bucket to upload to
    #[arg(
        short,
        long,
        env = "UNIFIBACKUP_BUCKET",
        value_name = "NAME",
        required_unless_present = "local",
        conflicts_with = "local"
    )]
    pub bucket: Option<String>,

    /// Directory to upload to instead of S3
    #[arg(long, env = "UNIFIBACKUP_LOCAL", value_name = "DIR")]
    pub local: Option<PathBuf>,

    /// Prepended to each backup's file name to form its object key
    #[arg(short, long, env = "UNIFIBACKUP_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Time allowed for each backup's upload and the previous backup's deletion
    #[arg(
        short,
        long,
        env = "UNIFIBACKUP_TIMEOUT",
        value_name = "DURATION",
        default_value = DEFAULT_TIMEOUT,
        value_parser = parse_duration,
    )]
    pub timeout: Duration,

    /// Print stats on shutdown
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(Args, Debug)]
pub struct GenmetaArgs {
    /// Directory containing only autobackups
    #[arg(short, long, env = "UNIFIBACKUP_DIR", default_value = DEFAULT_DIR)]
    pub dir: PathBuf,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(Args, Debug)]
pub struct LoggerArgs {
    /// When to use color in output
    #[arg(short, long, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print more output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub verbose: u8,

    /// Print less output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub quiet: u8,
}
