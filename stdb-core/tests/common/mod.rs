//! Test fixture: lays out synthetic STDB catalogs on disk.
//!
//! The library is decode-only, so fixtures are written byte by byte here.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const BLOCK: usize = 512;
pub const DB_NAME: &str = "stdb.dat";

/// Track id whose media lives in the album's own directory
pub fn tid(album_id: u32, n: u32) -> u32 {
    (album_id << 16) | n
}

pub fn utf16_padded(s: &str, bytes: usize) -> Vec<u8> {
    let mut out: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    out.resize(bytes, 0);
    out
}

fn put_u32(block: &mut [u8], offset: usize, value: u32) {
    block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[derive(Clone)]
pub struct FixtureTrack {
    pub slot: usize,
    pub id: u32,
    pub length_ms: u32,
    pub name: String,
}

#[derive(Clone)]
pub struct FixtureGroup {
    pub album_id: u32,
    pub group_id: u32,
    pub tracks: Vec<FixtureTrack>,
}

#[derive(Clone)]
pub struct FixtureAlbum {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Default)]
pub struct CatalogBuilder {
    pub albums: Vec<FixtureAlbum>,
    pub groups: Vec<FixtureGroup>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn album(mut self, id: u32, name: &str) -> Self {
        self.albums.push(FixtureAlbum {
            id,
            name: name.to_string(),
        });
        self
    }

    /// Add a group; `tracks` are `(slot, id, length_ms, name)`
    pub fn group(
        mut self,
        album_id: u32,
        group_id: u32,
        tracks: &[(usize, u32, u32, &str)],
    ) -> Self {
        self.groups.push(FixtureGroup {
            album_id,
            group_id,
            tracks: tracks
                .iter()
                .map(|&(slot, id, length_ms, name)| FixtureTrack {
                    slot,
                    id,
                    length_ms,
                    name: name.to_string(),
                })
                .collect(),
        });
        self
    }

    fn groups_of(&self, album_id: u32) -> impl Iterator<Item = &FixtureGroup> + '_ {
        self.groups.iter().filter(move |g| g.album_id == album_id)
    }

    pub fn header_block(&self) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK];
        put_u32(&mut block, 0, 0x0000_0001);
        put_u32(&mut block, 4, self.albums.len() as u32);
        let next_album = self.albums.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        put_u32(&mut block, 8, next_album);
        for (i, album) in self.albums.iter().enumerate() {
            put_u32(&mut block, 12 + i * 4, album.id);
        }
        let next_track = self
            .groups
            .iter()
            .flat_map(|g| g.tracks.iter().map(|t| t.id))
            .max()
            .unwrap_or(0)
            + 1;
        put_u32(&mut block, 412, next_track);
        block
    }

    pub fn album_block(&self, album: &FixtureAlbum) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK];
        put_u32(&mut block, 0, 0x0002_1371);
        put_u32(&mut block, 4, album.id);
        let groups: Vec<&FixtureGroup> = self.groups_of(album.id).collect();
        put_u32(&mut block, 8, groups.len() as u32);
        for (i, group) in groups.iter().enumerate() {
            put_u32(&mut block, 12 + i * 4, group.group_id);
        }
        let length: u32 = groups
            .iter()
            .flat_map(|g| g.tracks.iter().map(|t| t.length_ms))
            .sum();
        put_u32(&mut block, 348, length);
        block[352..480].copy_from_slice(&utf16_padded(&album.name, 128));
        block
    }

    pub fn group_block(group: &FixtureGroup) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK];
        put_u32(&mut block, 0, 0x0003_1073);
        put_u32(&mut block, 4, group.album_id);
        put_u32(&mut block, 8, group.group_id);
        for track in &group.tracks {
            put_u32(&mut block, 16 + track.slot * 4, track.id);
            put_u32(&mut block, 40 + track.slot * 4, track.length_ms);
            let start = 64 + track.slot * 64;
            block[start..start + 64].copy_from_slice(&utf16_padded(&track.name, 64));
        }
        block
    }

    /// The complete database file
    pub fn bytes(&self) -> Vec<u8> {
        let mut data = self.header_block();
        for album in &self.albums {
            data.extend(self.album_block(album));
        }
        data.resize(101 * BLOCK, 0);
        for group in &self.groups {
            data.extend(Self::group_block(group));
        }
        data
    }

    /// Create every album directory and media file under `root`
    pub fn write_media(&self, root: &Path) {
        for album in &self.albums {
            fs::create_dir_all(root.join(format!("{:04x}", album.id))).unwrap();
        }
        for track in self.groups.iter().flat_map(|g| g.tracks.iter()) {
            let hex = format!("{:08x}", track.id);
            let dir = root.join(&hex[..4]);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("{}.wma", hex)), b"").unwrap();
        }
    }

    /// Write the database file and its media tree; returns the database path
    pub fn write(&self, root: &Path) -> PathBuf {
        self.write_media(root);
        write_db(root, &self.bytes())
    }
}

pub fn write_db(root: &Path, data: &[u8]) -> PathBuf {
    let path = root.join(DB_NAME);
    fs::write(&path, data).unwrap();
    path
}

/// Two albums; album 2 has a sparse group
pub fn sample() -> CatalogBuilder {
    CatalogBuilder::new()
        .album(1, "Test Album")
        .album(2, "Zweites Album")
        .group(
            1,
            1,
            &[
                (0, tid(1, 1), 180_000, "Opening"),
                (1, tid(1, 2), 200_000, "Second"),
            ],
        )
        .group(1, 2, &[(0, tid(1, 3), 240_000, "Third")])
        .group(
            2,
            1,
            &[
                (1, tid(2, 1), 100_000, "Eins"),
                (4, tid(2, 2), 150_000, "Zwei"),
            ],
        )
}
