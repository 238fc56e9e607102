//! stdb-core: decoder for STDB music-device catalogs
//!
//! An STDB file is a flat run of 512-byte little-endian blocks:
//! - a Header listing album ids and id counters
//! - up to 100 Album blocks
//! - TrackGroup blocks, each holding up to six tracks in parallel arrays
//!
//! [`Database::open`] decodes the whole file, links groups and tracks to their
//! albums and checks that every album directory and `.wma` media file exists
//! next to the database. Decoding is the only supported direction.

pub mod db;
pub mod error;
pub mod field;
pub mod model;
pub mod record;
pub mod schema;
pub mod validate;

pub use db::{Database, OpenOptions};
pub use error::{Error, Result};
pub use field::{Format, Value};
pub use model::{Album, Header, Track, TrackGroup, TrackGroupUid};
pub use record::{BlockReader, FieldSpec, Record, Schema, BLOCK_SIZE};
pub use validate::{validate_database, CatalogStats, ValidationReport};
