#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod cli;

mod autobackup;
mod daemon;
mod error;
mod format;
mod logger;
mod monitor;
mod stats;
mod storage;
mod upload;
