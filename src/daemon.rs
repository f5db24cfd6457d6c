use std::{future::Future, io, path::PathBuf, time::Duration};

use async_channel::Receiver;
use chrono::Utc;
use log::{error, info, warn};
use tokio::{signal, spawn, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    format::format_path,
    stats::Metrics,
    storage::ObjectStore,
    upload::Uploader,
};

/// Returns `Ok` once `shutdown` is cancelled, abandoning any upload in flight.
/// Failed uploads are not retried.
pub async fn run<S, M, N>(
    backups: Receiver<Result<PathBuf>>,
    uploader: &mut Uploader<S, M>,
    timeout: Duration,
    metrics: &N,
    shutdown: &CancellationToken,
) -> Result<()>
where
    S: ObjectStore,
    M: Metrics,
    N: Metrics,
{
    info!("waiting for new backups");
    loop {
        let received = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(()),
            received = backups.recv() => received,
        };

        let path = match received {
            Ok(Ok(path)) => path,
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(Error::MonitorStopped),
        };

        let deadline = Instant::now() + timeout;
        let result = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                warn!("abandoning upload of {}", format_path(&path));
                return Ok(());
            }
            result = uploader.upload(&path, deadline) => result,
        };

        match result {
            Ok(_) => metrics.backup_succeeded(Utc::now()),
            Err(err) => {
                error!("upload error: {err}");
                metrics.backup_failed();
            }
        }
    }
}

pub fn shutdown_signal() -> Result<CancellationToken> {
    Ok(cancel_after(listen()?))
}

#[cfg(unix)]
fn listen() -> Result<impl Future<Output = io::Result<()>>> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    })
}

#[cfg(not(unix))]
fn listen() -> Result<impl Future<Output = io::Result<()>>> {
    Ok(signal::ctrl_c())
}

fn cancel_after<F>(listener: F) -> CancellationToken
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let token = CancellationToken::new();
    let cancel = token.clone();
    spawn(async move {
        match listener.await {
            Ok(()) => info!("shutting down"),
            Err(err) => error!("failed to listen for shutdown signals: {err}"),
        }
        cancel.cancel();
    });
    token
}
