//! Catalog consistency report
//!
//! Opening a database only fails on what the catalog cannot do without: a
//! readable block layout, known album references and present media. This
//! module checks the softer invariants on an already opened [`Database`].
//!
//! Id counters that would hand out an id already in use are errors and make
//! the report invalid. Everything else is a warning:
//! - record magic values
//! - header album list versus decoded albums
//! - album group lists, group counts and summed lengths versus linked tracks
//! - tracks stored outside their album directory
//! - media files on disk that no track references

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use walkdir::WalkDir;

use crate::db::Database;
use crate::model::MEDIA_EXTENSION;
use crate::schema::{ALBUM_MAGIC, HEADER_MAGIC, TRACK_GROUP_MAGIC};

/// Totals gathered while validating
#[derive(Debug, Default, Clone, Serialize)]
pub struct CatalogStats {
    pub album_count: usize,
    pub track_group_count: usize,
    pub track_count: usize,
    pub total_length_ms: u64,
    pub media_files_on_disk: usize,
}

/// Result of validating a catalog
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub stats: CatalogStats,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            valid: true,
            stats: CatalogStats::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn add_error(&mut self, msg: impl Into<String>) {
        self.valid = false;
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Print the report to stdout
    pub fn print(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Catalog Validation Results")?;
        writeln!(f, "==========================")?;
        writeln!(f)?;
        writeln!(f, "Status: {}", if self.valid { "VALID" } else { "INVALID" })?;
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Albums: {}", self.stats.album_count)?;
        writeln!(f, "  Track groups: {}", self.stats.track_group_count)?;
        writeln!(f, "  Tracks: {}", self.stats.track_count)?;
        writeln!(f, "  Total length: {} ms", self.stats.total_length_ms)?;
        writeln!(f, "  Media files on disk: {}", self.stats.media_files_on_disk)?;

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors:")?;
            for err in &self.errors {
                writeln!(f, "  - {}", err)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warn in &self.warnings {
                writeln!(f, "  - {}", warn)?;
            }
        }
        Ok(())
    }
}

/// Validate an opened catalog and return detailed results
pub fn validate_database(db: &Database) -> ValidationReport {
    let mut report = ValidationReport::new();

    report.stats.album_count = db.album_count();
    report.stats.track_group_count = db.track_group_count();
    report.stats.track_count = db.track_count();
    report.stats.total_length_ms = db.tracks().map(|t| t.length_ms as u64).sum();

    check_magic(db, &mut report);
    check_header(db, &mut report);
    check_albums(db, &mut report);
    check_media_files(db, &mut report);

    report
}

fn check_magic(db: &Database, report: &mut ValidationReport) {
    let header = db.header();
    if header.magic != HEADER_MAGIC {
        report.add_warning(format!(
            "Header magic 0x{:08x} (expected 0x{:08x})",
            header.magic, HEADER_MAGIC
        ));
    }

    for album in db.albums() {
        if album.magic != ALBUM_MAGIC {
            report.add_warning(format!(
                "Album {} at offset {}: magic 0x{:08x} (expected 0x{:08x})",
                album.album_id, album.offset, album.magic, ALBUM_MAGIC
            ));
        }
    }

    for group in db.track_groups() {
        if group.magic != TRACK_GROUP_MAGIC {
            report.add_warning(format!(
                "Track group {} at offset {}: magic 0x{:08x} (expected 0x{:08x})",
                group.uid(),
                group.offset,
                group.magic,
                TRACK_GROUP_MAGIC
            ));
        }
    }
}

fn check_header(db: &Database, report: &mut ValidationReport) {
    let header = db.header();
    let declared: Vec<u32> = header.declared_album_ids().collect();

    if declared.len() != header.count_albums as usize {
        report.add_warning(format!(
            "Header count_albums is {} but lists {} album ids",
            header.count_albums,
            declared.len()
        ));
    }

    for id in &declared {
        if db.album(*id).is_none() {
            report.add_warning(format!("Header lists album {} which has no album block", id));
        }
    }
    for album in db.albums() {
        if !declared.contains(&album.album_id) {
            report.add_warning(format!(
                "Album {} ({:?}) is not listed in the header",
                album.album_id, album.name
            ));
        }
    }

    if let Some(max) = db.albums().map(|a| a.album_id).max() {
        if header.next_album_id <= max {
            report.add_error(format!(
                "next_album_id {} is not above the highest album id {}",
                header.next_album_id, max
            ));
        }
    }
    if let Some(max) = db.tracks().map(|t| t.id).max() {
        if header.next_track_id <= max {
            report.add_error(format!(
                "next_track_id 0x{:08x} is not above the highest track id 0x{:08x}",
                header.next_track_id, max
            ));
        }
    }
}

fn check_albums(db: &Database, report: &mut ValidationReport) {
    for album in db.albums() {
        let declared: Vec<u32> = album.declared_group_ids().collect();
        let linked: Vec<u32> = album
            .group_uids()
            .iter()
            .map(|uid| uid.track_group_id)
            .collect();

        for id in &declared {
            if !linked.contains(id) {
                report.add_warning(format!(
                    "Album {} lists track group {} which has no block",
                    album.album_id, id
                ));
            }
        }
        for id in &linked {
            if !declared.contains(id) {
                report.add_warning(format!(
                    "Track group {} claims album {} but is not listed by it",
                    id, album.album_id
                ));
            }
        }

        if album.count_tracks as usize != linked.len() {
            report.add_warning(format!(
                "Album {} count_tracks is {} but {} track groups are linked",
                album.album_id,
                album.count_tracks,
                linked.len()
            ));
        }

        let summed: u64 = db.tracks_of(album).map(|t| t.length_ms as u64).sum();
        if summed != album.length_ms as u64 {
            report.add_warning(format!(
                "Album {} length is {} ms but its tracks sum to {} ms",
                album.album_id, album.length_ms, summed
            ));
        }

        let dir = album.dir_name();
        for track in db.tracks_of(album) {
            if !track.hex_id().starts_with(&dir) {
                report.add_warning(format!(
                    "Track {:?} ({}) lives outside album directory {}",
                    track.name,
                    track.media_path.display(),
                    dir
                ));
            }
        }
    }
}

fn check_media_files(db: &Database, report: &mut ValidationReport) {
    let referenced: HashSet<PathBuf> = db.tracks().map(|t| db.media_path(t)).collect();

    for entry in WalkDir::new(db.root())
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_media = entry.file_type().is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(MEDIA_EXTENSION))
                .unwrap_or(false);
        if !is_media {
            continue;
        }

        report.stats.media_files_on_disk += 1;
        if !referenced.contains(path) {
            report.add_warning(format!("Unreferenced media file {:?}", path));
        }
    }
}
