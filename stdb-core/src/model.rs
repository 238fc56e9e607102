//! Typed catalog entities
//!
//! Header, Album and TrackGroup are built from decoded [`Record`]s. Track is
//! synthetic: it is one populated slot of a TrackGroup's parallel arrays.
//! Relations between entities are kept as ids; the database resolves them.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::TRACK_SLOTS;

/// Extension of every track media file
pub const MEDIA_EXTENSION: &str = "wma";

/// Database header (block 0)
#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub magic: u32,
    pub count_albums: u32,
    pub next_album_id: u32,
    /// All 100 slots, unused ones are zero
    pub album_ids: Vec<u32>,
    pub next_track_id: u32,
    #[serde(skip)]
    record: Record,
}

impl Header {
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Non-zero album ids in slot order
    pub fn declared_album_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.album_ids.iter().copied().filter(|&id| id != 0)
    }
}

impl TryFrom<Record> for Header {
    type Error = Error;

    fn try_from(record: Record) -> Result<Self> {
        Ok(Self {
            magic: record.u32("magic")?,
            count_albums: record.u32("count_albums")?,
            next_album_id: record.u32("next_album_id")?,
            album_ids: record.u32s("album_ids")?.to_vec(),
            next_track_id: record.u32("next_track_id")?,
            record,
        })
    }
}

/// Directory name of an album: 4 lowercase hex digits
pub fn album_dir_name(album_id: u32) -> String {
    format!("{:04x}", album_id)
}

/// Album block plus the groups and tracks registered to it
#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub offset: u64,
    pub magic: u32,
    pub album_id: u32,
    pub count_tracks: u32,
    /// All 84 slots as stored, unused ones are zero
    pub track_group_ids: Vec<u32>,
    pub length_ms: u32,
    pub name: String,
    /// Registered groups in assembly order
    groups: Vec<TrackGroupUid>,
    /// Registered tracks in assembly order
    tracks: Vec<u32>,
    #[serde(skip)]
    record: Record,
}

impl Album {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn dir_name(&self) -> String {
        album_dir_name(self.album_id)
    }

    /// Non-zero track-group ids as listed in the album block
    pub fn declared_group_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.track_group_ids.iter().copied().filter(|&id| id != 0)
    }

    pub fn group_uids(&self) -> &[TrackGroupUid] {
        &self.groups
    }

    /// Resolve an album-local track-group id
    pub fn group_uid(&self, track_group_id: u32) -> Option<TrackGroupUid> {
        self.groups
            .iter()
            .copied()
            .find(|uid| uid.track_group_id == track_group_id)
    }

    pub fn track_ids(&self) -> &[u32] {
        &self.tracks
    }

    pub(crate) fn add_group(&mut self, uid: TrackGroupUid) -> Result<()> {
        if self.group_uid(uid.track_group_id).is_some() {
            return Err(Error::Duplicate {
                kind: "track group",
                key: uid.to_string(),
            });
        }
        self.groups.push(uid);
        Ok(())
    }

    pub(crate) fn add_track(&mut self, track_id: u32) {
        self.tracks.push(track_id);
    }
}

impl TryFrom<Record> for Album {
    type Error = Error;

    fn try_from(record: Record) -> Result<Self> {
        Ok(Self {
            offset: record.offset(),
            magic: record.u32("magic")?,
            album_id: record.u32("album_id")?,
            count_tracks: record.u32("count_tracks")?,
            track_group_ids: record.u32s("track_group_ids")?.to_vec(),
            length_ms: record.u32("album_length_ms")?,
            name: record.str("album_name")?.to_string(),
            groups: Vec::new(),
            tracks: Vec::new(),
            record,
        })
    }
}

/// Globally unique track-group key.
///
/// `track_group_id` is only unique within its album, so the key pairs it with
/// the owning album id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackGroupUid {
    pub album_id: u32,
    pub track_group_id: u32,
}

impl TrackGroupUid {
    pub fn new(album_id: u32, track_group_id: u32) -> Self {
        Self {
            album_id,
            track_group_id,
        }
    }
}

impl fmt::Display for TrackGroupUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.album_id, self.track_group_id)
    }
}

impl Serialize for TrackGroupUid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Track-group block plus the tracks registered from its slots
#[derive(Debug, Clone, Serialize)]
pub struct TrackGroup {
    pub offset: u64,
    pub magic: u32,
    pub album_id: u32,
    pub track_group_id: u32,
    pub reserved: u32,
    pub track_ids: Vec<u32>,
    pub track_lengths_ms: Vec<u32>,
    pub track_names: Vec<String>,
    /// Registered tracks in slot order
    tracks: Vec<u32>,
    #[serde(skip)]
    record: Record,
}

impl TrackGroup {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn uid(&self) -> TrackGroupUid {
        TrackGroupUid::new(self.album_id, self.track_group_id)
    }

    pub fn track_ids_registered(&self) -> &[u32] {
        &self.tracks
    }

    /// Build the track held in `slot`, if that slot is populated.
    ///
    /// Slots are not necessarily contiguous: an empty slot may sit between
    /// two populated ones.
    pub fn slot(&self, slot: usize) -> Option<Track> {
        let id = *self.track_ids.get(slot)?;
        if id == 0 {
            return None;
        }
        Some(Track {
            id,
            name: self.track_names.get(slot)?.clone(),
            length_ms: *self.track_lengths_ms.get(slot)?,
            slot,
            album_id: self.album_id,
            track_group_id: self.track_group_id,
            media_path: media_relative_path(id),
        })
    }

    /// Every populated slot, in slot order
    pub fn populated_slots(&self) -> impl Iterator<Item = Track> + '_ {
        (0..TRACK_SLOTS).filter_map(move |slot| self.slot(slot))
    }

    pub(crate) fn add_track(&mut self, track_id: u32) {
        self.tracks.push(track_id);
    }
}

impl TryFrom<Record> for TrackGroup {
    type Error = Error;

    fn try_from(record: Record) -> Result<Self> {
        let track_ids = record.u32s("track_ids")?.to_vec();
        let track_lengths_ms = record.u32s("track_lengths_ms")?.to_vec();
        let track_names = record.strs("track_names")?.to_vec();

        if [track_ids.len(), track_lengths_ms.len(), track_names.len()]
            .iter()
            .any(|&n| n != TRACK_SLOTS)
        {
            return Err(Error::Layout(format!(
                "track group at offset {} does not have {} parallel slots",
                record.offset(),
                TRACK_SLOTS
            )));
        }

        Ok(Self {
            offset: record.offset(),
            magic: record.u32("magic")?,
            album_id: record.u32("album_id")?,
            track_group_id: record.u32("track_group_id")?,
            reserved: record.u32("reserved")?,
            track_ids,
            track_lengths_ms,
            track_names,
            tracks: Vec::new(),
            record,
        })
    }
}

/// One populated slot of a track group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: u32,
    pub name: String,
    pub length_ms: u32,
    /// Index within the owning group's six slots
    pub slot: usize,
    pub album_id: u32,
    pub track_group_id: u32,
    /// Media file path relative to the database directory
    pub media_path: PathBuf,
}

impl Track {
    /// Track id as 8 lowercase hex digits
    pub fn hex_id(&self) -> String {
        track_hex_id(self.id)
    }

    pub fn group_uid(&self) -> TrackGroupUid {
        TrackGroupUid::new(self.album_id, self.track_group_id)
    }
}

pub fn track_hex_id(track_id: u32) -> String {
    format!("{:08x}", track_id)
}

/// `<first 4 hex digits>/<8 hex digits>.wma`
pub fn media_relative_path(track_id: u32) -> PathBuf {
    let hex = track_hex_id(track_id);
    PathBuf::from(&hex[..4]).join(format!("{}.{}", hex, MEDIA_EXTENSION))
}
