//! CLI configuration

use std::path::PathBuf;

use stdb_core::OpenOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Database file; media is resolved relative to its directory
    pub db_path: PathBuf,
    pub output: OutputFormat,
    pub open: OpenOptions,
    /// Run the consistency report after decoding
    pub check: bool,
}
