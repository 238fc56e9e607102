//! Catalog assembly
//!
//! Opening a database decodes the whole file in two passes:
//! 1. read the header, every album block and every track-group block into
//!    flat collections keyed by their natural ids
//! 2. link groups and tracks to their albums by id and check that every
//!    referenced album directory and media file exists next to the database
//!
//! Any failure aborts the open; there is no partially assembled catalog.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::model::{Album, Header, Track, TrackGroup, TrackGroupUid};
use crate::record::{BlockReader, Record, Schema, BLOCK_SIZE};
use crate::schema::{album_offset, ALBUM, HEADER, MAX_ALBUMS, TRACK_GROUP, TRACK_GROUP_REGION_START};

/// Options for [`Database::open_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Fail on any record whose magic differs from its schema's constant
    pub verify_magic: bool,
}

/// Insertion-ordered table with unique keys
struct Table<K, V> {
    entries: Vec<V>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + fmt::Display, V> Table<K, V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn insert(&mut self, kind: &'static str, key: K, value: V) -> Result<()> {
        if self.index.contains_key(&key) {
            return Err(Error::Duplicate {
                kind,
                key: key.to_string(),
            });
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(value);
        Ok(())
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    fn values(&self) -> std::slice::Iter<'_, V> {
        self.entries.iter()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Raw records from the first pass
struct Decoded {
    header: Header,
    albums: Table<u32, Album>,
    groups: Vec<TrackGroup>,
    size: u64,
}

/// A fully decoded and linked catalog
pub struct Database {
    path: PathBuf,
    root: PathBuf,
    size: u64,
    header: Header,
    albums: Table<u32, Album>,
    groups: Table<TrackGroupUid, TrackGroup>,
    tracks: Table<u32, Track>,
}

impl Database {
    /// Open and decode the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, OpenOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let file = File::open(&path)?;
        let mut db = Self::from_reader(file, root, options)?;
        db.path = path;
        Ok(db)
    }

    /// Decode from any seekable source; media files are resolved under `root`
    pub fn from_reader<R: Read + Seek>(
        source: R,
        root: impl Into<PathBuf>,
        options: OpenOptions,
    ) -> Result<Self> {
        let root = root.into();
        let decoded = decode_records(source, options)?;
        let db = link(decoded, root)?;

        info!(
            "Opened catalog in {:?}: {} albums, {} track groups, {} tracks",
            db.root,
            db.albums.len(),
            db.groups.len(),
            db.tracks.len()
        );
        Ok(db)
    }

    /// Path of the database file (empty when built from a reader)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the album folders and media files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Size of the decoded file in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Albums in block order
    pub fn albums(&self) -> impl Iterator<Item = &Album> + '_ {
        self.albums.values()
    }

    pub fn album(&self, album_id: u32) -> Option<&Album> {
        self.albums.get(&album_id)
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    /// Track groups in block order
    pub fn track_groups(&self) -> impl Iterator<Item = &TrackGroup> + '_ {
        self.groups.values()
    }

    pub fn track_group(&self, uid: &TrackGroupUid) -> Option<&TrackGroup> {
        self.groups.get(uid)
    }

    pub fn track_group_count(&self) -> usize {
        self.groups.len()
    }

    /// Tracks in block order, then slot order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.tracks.values()
    }

    pub fn track(&self, track_id: u32) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Groups registered to `album`, in assembly order
    pub fn groups_of<'a>(&'a self, album: &'a Album) -> impl Iterator<Item = &'a TrackGroup> + 'a {
        album.group_uids().iter().filter_map(move |uid| self.groups.get(uid))
    }

    /// Tracks registered to `album`, in assembly order
    pub fn tracks_of<'a>(&'a self, album: &'a Album) -> impl Iterator<Item = &'a Track> + 'a {
        album.track_ids().iter().filter_map(move |id| self.tracks.get(id))
    }

    /// Tracks registered to `group`, in slot order
    pub fn tracks_in<'a>(&'a self, group: &'a TrackGroup) -> impl Iterator<Item = &'a Track> + 'a {
        group
            .track_ids_registered()
            .iter()
            .filter_map(move |id| self.tracks.get(id))
    }

    pub fn album_of(&self, track: &Track) -> Option<&Album> {
        self.albums.get(&track.album_id)
    }

    pub fn group_of(&self, track: &Track) -> Option<&TrackGroup> {
        self.groups.get(&track.group_uid())
    }

    /// Absolute (root-joined) media path of a track
    pub fn media_path(&self, track: &Track) -> PathBuf {
        self.root.join(&track.media_path)
    }

    /// Album directory under the root
    pub fn album_dir(&self, album: &Album) -> PathBuf {
        self.root.join(album.dir_name())
    }

    /// Writing a catalog is not implemented.
    pub fn write_to<W: Write>(&self, _writer: W) -> Result<()> {
        Err(Error::Unsupported("writing an STDB database".into()))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("albums", &self.albums.len())
            .field("track_groups", &self.groups.len())
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

impl Serialize for Database {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Database", 5)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("header", &self.header)?;
        state.serialize_field("albums", &self.albums.entries)?;
        state.serialize_field("track_groups", &self.groups.entries)?;
        state.serialize_field("tracks", &self.tracks.entries)?;
        state.end()
    }
}

fn read_checked<R: Read + Seek>(
    reader: &mut BlockReader<R>,
    offset: u64,
    schema: &Schema,
    options: OpenOptions,
) -> Result<Record> {
    let record = reader.read(offset, schema)?;
    if options.verify_magic {
        schema.verify_magic(&record)?;
    }
    Ok(record)
}

/// First pass: decode every block into flat collections
fn decode_records<R: Read + Seek>(source: R, options: OpenOptions) -> Result<Decoded> {
    let mut reader = BlockReader::new(source)?;

    let header = Header::try_from(read_checked(&mut reader, 0, &HEADER, options)?)?;
    debug!("Header: {}", header.record());

    if header.count_albums as usize > MAX_ALBUMS {
        return Err(Error::Layout(format!(
            "count_albums {} exceeds the {} album slots",
            header.count_albums, MAX_ALBUMS
        )));
    }

    let mut albums = Table::new();
    for index in 0..header.count_albums {
        let record = read_checked(&mut reader, album_offset(index), &ALBUM, options)?;
        let album = Album::try_from(record)?;
        debug!(
            "Album {} {:?} at offset {}",
            album.album_id, album.name, album.offset
        );
        albums.insert("album", album.album_id, album)?;
    }

    let mut groups = Vec::new();
    let mut offset = TRACK_GROUP_REGION_START;
    while offset < reader.len() {
        let record = reader.read(offset, &TRACK_GROUP)?;
        offset += BLOCK_SIZE as u64;

        if record.is_empty() {
            trace!("Skipping empty track group block at offset {}", record.offset());
            continue;
        }
        if options.verify_magic {
            TRACK_GROUP.verify_magic(&record)?;
        }

        let group = TrackGroup::try_from(record)?;
        debug!(
            "Track group {} of album {} at offset {}",
            group.track_group_id, group.album_id, group.offset
        );
        groups.push(group);
    }

    Ok(Decoded {
        header,
        albums,
        groups,
        size: reader.len(),
    })
}

/// Second pass: register groups and tracks with their albums
fn link(decoded: Decoded, root: PathBuf) -> Result<Database> {
    let Decoded {
        header,
        mut albums,
        groups: decoded_groups,
        size,
    } = decoded;

    for album in albums.values() {
        let dir = root.join(album.dir_name());
        if !dir.is_dir() {
            return Err(Error::MissingAlbumDir {
                path: dir,
                name: album.name.clone(),
            });
        }
    }

    let mut groups = Table::new();
    let mut tracks = Table::new();

    for mut group in decoded_groups {
        let uid = group.uid();
        let album = albums.get_mut(&group.album_id).ok_or(Error::UnknownAlbum {
            album_id: group.album_id,
            offset: group.offset,
        })?;
        album.add_group(uid)?;

        let slots: Vec<Track> = group.populated_slots().collect();
        if slots.is_empty() {
            trace!("Track group {} has no populated slots", uid);
        }

        for track in slots {
            let media = root.join(&track.media_path);
            if !media.is_file() {
                return Err(Error::MissingMedia {
                    path: media,
                    name: track.name,
                });
            }

            let id = track.id;
            tracks.insert("track", id, track)?;
            group.add_track(id);
            album.add_track(id);
        }

        groups.insert("track group", uid, group)?;
    }

    Ok(Database {
        path: PathBuf::new(),
        root,
        size,
        header,
        albums,
        groups,
        tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_preserves_insertion_order() {
        let mut table = Table::new();
        table.insert("album", 9u32, "nine").unwrap();
        table.insert("album", 2u32, "two").unwrap();
        table.insert("album", 5u32, "five").unwrap();

        let values: Vec<&str> = table.values().copied().collect();
        assert_eq!(values, vec!["nine", "two", "five"]);
        assert_eq!(table.get(&2), Some(&"two"));
    }

    #[test]
    fn test_table_rejects_duplicates() {
        let mut table = Table::new();
        table.insert("album", 1u32, ()).unwrap();
        let err = table.insert("album", 1u32, ()).unwrap_err();
        assert!(matches!(err, Error::Duplicate { kind: "album", .. }));
    }

    #[test]
    fn test_empty_file_is_short_read() {
        let source = std::io::Cursor::new(Vec::new());
        let err = Database::from_reader(source, ".", OpenOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ShortRead { offset: 0, actual: 0, .. }));
    }
}
