use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    unifibackup::cli::main().await
}
