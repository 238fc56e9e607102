//! On-disk record layouts
//!
//! The file is a flat run of 512-byte blocks, all integers little-endian:
//!
//! ```text
//! block 0          Header
//! blocks 1..=100   Album slots (the first `count_albums` are valid)
//! blocks 101..     TrackGroup, one per block until EOF
//! ```
//!
//! Header:
//! - 0x000: magic (0x00000001)
//! - 0x004: count_albums
//! - 0x008: next_album_id
//! - 0x00C: album_ids[100]
//! - 0x19C: next_track_id
//! - 0x1A0: padding[96]
//!
//! Album:
//! - 0x000: magic (0x00021371)
//! - 0x004: album_id
//! - 0x008: count_tracks
//! - 0x00C: track_group_ids[84]
//! - 0x15C: album_length_ms
//! - 0x160: album_name, 64 UTF-16 code units
//! - 0x1E0: padding[32]
//!
//! TrackGroup (fields packed back to back):
//! - magic (0x00031073), album_id, track_group_id, reserved
//! - track_ids[6], track_lengths_ms[6]
//! - track_names: 6 strings of 32 UTF-16 code units
//! - padding[64]

use crate::field::Format;
use crate::record::{packed, FieldSpec, Schema, BLOCK_SIZE};

pub const HEADER_MAGIC: u32 = 0x0000_0001;
pub const ALBUM_MAGIC: u32 = 0x0002_1371;
pub const TRACK_GROUP_MAGIC: u32 = 0x0003_1073;

/// Album slots between the header and the track-group region
pub const MAX_ALBUMS: usize = 100;

/// Track-group ids an album can list
pub const MAX_GROUPS_PER_ALBUM: usize = 84;

/// Parallel track slots per track group
pub const TRACK_SLOTS: usize = 6;

/// Album names are 64 code units wide
pub const ALBUM_NAME_UNITS: usize = 64;

/// Each of the six track names is 64 bytes wide
pub const TRACK_NAME_BYTES: usize = 64;

/// First album block
pub const ALBUM_REGION_START: u64 = BLOCK_SIZE as u64;

/// First track-group block, right after the last album slot
pub const TRACK_GROUP_REGION_START: u64 = ((1 + MAX_ALBUMS) * BLOCK_SIZE) as u64;

static HEADER_FIELDS: [FieldSpec; 5] = [
    FieldSpec::at("magic", 0x000, Format::U32),
    FieldSpec::at("count_albums", 0x004, Format::U32),
    FieldSpec::at("next_album_id", 0x008, Format::U32),
    FieldSpec::at("album_ids", 0x00C, Format::U32Array(MAX_ALBUMS)),
    FieldSpec::at("next_track_id", 0x19C, Format::U32),
];

static ALBUM_FIELDS: [FieldSpec; 6] = [
    FieldSpec::at("magic", 0x000, Format::U32),
    FieldSpec::at("album_id", 0x004, Format::U32),
    FieldSpec::at("count_tracks", 0x008, Format::U32),
    FieldSpec::at("track_group_ids", 0x00C, Format::U32Array(MAX_GROUPS_PER_ALBUM)),
    FieldSpec::at("album_length_ms", 0x15C, Format::U32),
    FieldSpec::at("album_name", 0x160, Format::utf16(ALBUM_NAME_UNITS)),
];

static TRACK_GROUP_FIELDS: [FieldSpec; 7] = packed([
    ("magic", Format::U32),
    ("album_id", Format::U32),
    ("track_group_id", Format::U32),
    ("reserved", Format::U32),
    ("track_ids", Format::U32Array(TRACK_SLOTS)),
    ("track_lengths_ms", Format::U32Array(TRACK_SLOTS)),
    (
        "track_names",
        Format::Utf16 {
            bytes: TRACK_NAME_BYTES,
            count: TRACK_SLOTS,
        },
    ),
]);

pub static HEADER: Schema = Schema {
    name: "Header",
    magic: HEADER_MAGIC,
    size: BLOCK_SIZE,
    fields: &HEADER_FIELDS,
};

pub static ALBUM: Schema = Schema {
    name: "Album",
    magic: ALBUM_MAGIC,
    size: BLOCK_SIZE,
    fields: &ALBUM_FIELDS,
};

pub static TRACK_GROUP: Schema = Schema {
    name: "TrackGroup",
    magic: TRACK_GROUP_MAGIC,
    size: BLOCK_SIZE,
    fields: &TRACK_GROUP_FIELDS,
};

/// Byte offset of the `index`-th album block
pub fn album_offset(index: u32) -> u64 {
    ALBUM_REGION_START + index as u64 * BLOCK_SIZE as u64
}

/// Byte offset of the `index`-th track-group block
pub fn track_group_offset(index: u64) -> u64 {
    TRACK_GROUP_REGION_START + index * BLOCK_SIZE as u64
}
