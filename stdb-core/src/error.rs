//! Error types for stdb-core

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Binary format error: {0}")]
    BinRw(String),

    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid layout: {0}")]
    Layout(String),

    #[error(
        "Bad magic in {kind} at offset {offset}: expected 0x{expected:08x}, found 0x{found:08x}"
    )]
    BadMagic {
        kind: &'static str,
        offset: u64,
        expected: u32,
        found: u32,
    },

    #[error("Field {field} of {record} lies outside the {size}-byte block")]
    FieldBounds {
        record: &'static str,
        field: &'static str,
        size: usize,
    },

    #[error("{record} has no field named {field}")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("Field {field} of {record} is not {expected}")]
    FieldType {
        record: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Track group at offset {offset} references unknown album {album_id}")]
    UnknownAlbum { album_id: u32, offset: u64 },

    #[error("Duplicate {kind} {key}")]
    Duplicate { kind: &'static str, key: String },

    #[error("Album directory {path:?} for album {name:?} does not exist")]
    MissingAlbumDir { path: PathBuf, name: String },

    #[error("Media file {path:?} for track {name:?} does not exist")]
    MissingMedia { path: PathBuf, name: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        Error::BinRw(e.to_string())
    }
}
