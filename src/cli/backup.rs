use std::{fmt::Display, sync::Arc};

use clap::builder::styling::AnsiColor;
use log::{info, warn};
use tokio::time::timeout;

use crate::{
    daemon::{self, shutdown_signal},
    error::Result,
    format::{format_duration, format_path, format_size, format_time},
    monitor::{EventKind, Monitor},
    stats::{Stats, Summary},
    storage::{LocalStore, S3Store, Store},
    upload::Uploader,
};

use super::{args::BackupArgs, check_dir};

pub async fn main(args: BackupArgs) -> Result<()> {
    check_dir(&args.dir)?;

    let store = match (args.bucket, args.local) {
        (Some(bucket), None) => Store::S3(S3Store::new(bucket).await),
        (None, Some(root)) => Store::Local(LocalStore::new(root)),
        _ => unreachable!("exactly one of --bucket and --local is required"),
    };
    info!("uploading backups from {} to {store}", format_path(&args.dir));

    let stats = Arc::new(Stats::new());
    let shutdown = shutdown_signal()?;
    let monitor = Monitor::new(&args.dir, stats.clone())?;
    let mut uploader = Uploader::new(store, args.prefix, stats.clone());

    let result = daemon::run(
        monitor.backups(),
        &mut uploader,
        args.timeout,
        &stats,
        &shutdown,
    )
    .await;
    monitor.close();

    if timeout(args.timeout, uploader.store().finish()).await.is_err() {
        warn!("gave up waiting for abandoned uploads to be cleaned up");
    }

    if let Some(key) = uploader.retained_key() {
        info!("latest upload is {key}");
    }

    if args.stats {
        print_stats(&stats.summary());
    }

    result
}

fn print_stats(summary: &Summary) {
    for kind in EventKind::ALL {
        print_stat(&format!("{kind} events"), summary.events[kind.index()]);
    }
    print_stat("watch errors", summary.fs_errors);
    print_stat("upload attempts", summary.upload_attempts);
    print_stat("upload failures", summary.upload_failures);
    print_stat("delete attempts", summary.delete_attempts);
    print_stat("delete failures", summary.delete_failures);
    print_stat("bytes uploaded", format_size(summary.uploaded_bytes));
    print_stat(
        "last upload time",
        format_duration(summary.last_upload_duration),
    );
    print_stat("backup failures", summary.backup_failures);
    match &summary.last_success {
        Some(time) => print_stat("last success", format_time(time)),
        None => print_stat("last success", "never"),
    }
}

fn print_stat<T: Display>(name: &str, value: T) {
    let style = AnsiColor::Yellow.on_default();
    info!("{style}{name}:{style:#} {value}");
}
