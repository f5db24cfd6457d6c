mod args;
mod backup;
mod genmeta;

use std::{path::Path, process::ExitCode};

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser, Subcommand,
};
use concolor_clap::ColorChoice;
use env_logger::WriteStyle;
use log::error;

use crate::{
    error::{Error, Result},
    logger,
};

use self::args::{BackupArgs, GenmetaArgs, LoggerArgs};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, propagate_version = true, styles = cli_styles())]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload each new autobackup, deleting the one uploaded before it
    Backup(BackupArgs),

    /// Regenerate autobackup_meta.json from the backups in a directory
    Genmeta(GenmetaArgs),
}

impl Command {
    fn logger(&self) -> &LoggerArgs {
        match self {
            Command::Backup(args) => &args.logger,
            Command::Genmeta(args) => &args.logger,
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.command.logger());

    let result = match cli.command {
        Command::Backup(args) => backup::main(args).await,
        Command::Genmeta(args) => genmeta::main(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(args: &LoggerArgs) {
    let level = logger::level_from_verbosity(args.verbose, args.quiet);
    let style = match args.color {
        ColorChoice::Always => WriteStyle::Always,
        ColorChoice::Never => WriteStyle::Never,
        _ => WriteStyle::Auto,
    };
    logger::init(level, style);
}

fn check_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(Error::DirectoryDoesNotExist(dir.to_owned()))
    }
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default())
        .usage(AnsiColor::BrightMagenta.on_default())
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
}
