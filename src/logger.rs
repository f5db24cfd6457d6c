use std::io::{self, Write};

use env_logger::{fmt::Formatter, WriteStyle};
use log::{Level, LevelFilter, Record};

pub fn init(level: LevelFilter, style: WriteStyle) {
    env_logger::Builder::new()
        .format(format)
        .filter_level(level)
        .write_style(style)
        .init();
}

pub fn level_from_verbosity(verbose: u8, quiet: u8) -> LevelFilter {
    match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn format(f: &mut Formatter, record: &Record) -> io::Result<()> {
    let args = record.args();
    let level = record.level();
    let style = f.default_level_style(level);
    match level {
        Level::Error => writeln!(f, "{style}error: {style:#}{args}"),
        Level::Warn => writeln!(f, "{style}warning: {style:#}{args}"),
        Level::Info => writeln!(f, "{args}"),
        Level::Debug | Level::Trace => {
            let target = record.target().trim_start_matches("unifibackup::");
            writeln!(f, "{style}{target}: {style:#}{args}")
        }
    }
}
