//! Console listing of a decoded catalog

use std::io::{self, Write};

use serde::Serialize;
use stdb_core::{Database, ValidationReport};

/// Print header fields, then every album with its tracks grouped in
/// assembly order
pub fn print_catalog<W: Write>(db: &Database, out: &mut W) -> io::Result<()> {
    writeln!(out, "Database: {}", db.path().display())?;
    writeln!(out, "Header:\n{}", db.header().record())?;

    for album in db.albums() {
        writeln!(out, "  {:02}: {}", album.album_id, album.name)?;
        for group in db.groups_of(album) {
            for track in db.tracks_in(group) {
                writeln!(out, "    {:02}: {} ({})", track.id, track.name, track.length_ms)?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckedCatalog<'a> {
    catalog: &'a Database,
    validation: &'a ValidationReport,
}

/// Write the catalog as one JSON document, wrapped together with the
/// validation report when there is one
pub fn write_json<W: Write>(
    db: &Database,
    report: Option<&ValidationReport>,
    out: &mut W,
) -> io::Result<()> {
    match report {
        Some(validation) => serde_json::to_writer_pretty(
            &mut *out,
            &CheckedCatalog {
                catalog: db,
                validation,
            },
        )?,
        None => serde_json::to_writer_pretty(&mut *out, db)?,
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn put_u32(data: &mut [u8], offset: usize, value: u32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_utf16(data: &mut [u8], offset: usize, s: &str) {
        for (i, unit) in s.encode_utf16().enumerate() {
            data[offset + i * 2..offset + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
    }

    /// One album (id 1) with one group holding tracks in slots 0 and 2
    fn write_catalog(root: &std::path::Path) -> std::path::PathBuf {
        let mut data = vec![0u8; 102 * 512];

        put_u32(&mut data, 0, 1);
        put_u32(&mut data, 4, 1);
        put_u32(&mut data, 8, 2);
        put_u32(&mut data, 12, 1);
        put_u32(&mut data, 412, 0x0001_0003);

        let album = 512;
        put_u32(&mut data, album, 0x0002_1371);
        put_u32(&mut data, album + 4, 1);
        put_u32(&mut data, album + 8, 1);
        put_u32(&mut data, album + 12, 1);
        put_u32(&mut data, album + 348, 3000);
        put_utf16(&mut data, album + 352, "Test Album");

        let group = 101 * 512;
        put_u32(&mut data, group, 0x0003_1073);
        put_u32(&mut data, group + 4, 1);
        put_u32(&mut data, group + 8, 1);
        put_u32(&mut data, group + 16, 0x0001_0001);
        put_u32(&mut data, group + 24, 0x0001_0002);
        put_u32(&mut data, group + 40, 1000);
        put_u32(&mut data, group + 48, 2000);
        put_utf16(&mut data, group + 64, "Intro");
        put_utf16(&mut data, group + 64 + 2 * 64, "Outro");

        fs::create_dir_all(root.join("0001")).unwrap();
        fs::write(root.join("0001/00010001.wma"), b"").unwrap();
        fs::write(root.join("0001/00010002.wma"), b"").unwrap();

        let path = root.join("stdb.dat");
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_print_catalog() {
        let tmp = TempDir::new().unwrap();
        let path = write_catalog(tmp.path());
        let db = Database::open(&path).unwrap();

        let mut out = Vec::new();
        print_catalog(&db, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], format!("Database: {}", path.display()));
        assert_eq!(lines[1], "Header:");
        assert!(lines[2].starts_with("{magic: 1, count_albums: 1, next_album_id: 2,"));
        assert_eq!(lines[3], "  01: Test Album");
        assert_eq!(lines[4], "    65537: Intro (1000)");
        assert_eq!(lines[5], "    65538: Outro (2000)");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_json_dump() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(write_catalog(tmp.path())).unwrap();

        let mut out = Vec::new();
        write_json(&db, None, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["tracks"][1]["slot"], 2);
        assert_eq!(json["tracks"][1]["media_path"], "0001/00010002.wma");
    }

    #[test]
    fn test_json_with_report_is_one_document() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(write_catalog(tmp.path())).unwrap();
        let report = stdb_core::validate_database(&db);

        let mut out = Vec::new();
        write_json(&db, Some(&report), &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["catalog"]["albums"][0]["name"], "Test Album");
        assert_eq!(json["validation"]["valid"], true);
        assert_eq!(json["validation"]["stats"]["track_count"], 2);
    }
}
