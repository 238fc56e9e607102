//! Schema-driven record reading
//!
//! A [`Schema`] is a static table of `(name, offset, format)` entries covering
//! one fixed-size block. [`BlockReader`] pulls a whole block out of the backing
//! source in a single read and decodes every field, so a record is either
//! complete or not produced at all.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};
use crate::field::{Format, Value};

/// Size of every on-disk record
pub const BLOCK_SIZE: usize = 512;

/// One named field inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub format: Format,
}

impl FieldSpec {
    pub const fn at(name: &'static str, offset: usize, format: Format) -> Self {
        Self { name, offset, format }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.format.size()
    }
}

/// Lay fields out back to back, each starting where the previous one ends
pub const fn packed<const N: usize>(fields: [(&'static str, Format); N]) -> [FieldSpec; N] {
    let mut specs = [FieldSpec::at("", 0, Format::U32); N];
    let mut offset = 0;
    let mut i = 0;
    while i < N {
        specs[i] = FieldSpec::at(fields[i].0, offset, fields[i].1);
        offset += fields[i].1.size();
        i += 1;
    }
    specs
}

/// Declared shape of a record kind
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    /// Expected value of the leading `magic` field
    pub magic: u32,
    pub size: usize,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that every field fits inside the block
    pub fn check(&self) -> Result<()> {
        for spec in self.fields {
            if spec.end() > self.size {
                return Err(Error::FieldBounds {
                    record: self.name,
                    field: spec.name,
                    size: self.size,
                });
            }
        }
        Ok(())
    }

    /// Decode every field from a block read at `offset`
    pub fn decode(&self, block: &[u8], offset: u64) -> Result<Record> {
        if block.len() < self.size {
            return Err(Error::ShortRead {
                offset,
                expected: self.size,
                actual: block.len(),
            });
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let bytes = block
                .get(spec.offset..spec.end())
                .filter(|_| spec.end() <= self.size)
                .ok_or(Error::FieldBounds {
                    record: self.name,
                    field: spec.name,
                    size: self.size,
                })?;
            fields.push((spec.name, spec.format.decode(bytes)?));
        }

        Ok(Record {
            kind: self.name,
            offset,
            fields,
        })
    }

    /// Compare a record's `magic` field against the expected constant
    pub fn verify_magic(&self, record: &Record) -> Result<()> {
        let found = record.u32("magic")?;
        if found != self.magic {
            return Err(Error::BadMagic {
                kind: self.name,
                offset: record.offset,
                expected: self.magic,
                found,
            });
        }
        Ok(())
    }
}

/// A decoded block: ordered field name to value mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    kind: &'static str,
    offset: u64,
    fields: Vec<(&'static str, Value)>,
}

impl Record {
    /// Schema name this record was decoded with
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Absolute byte offset of the block in the backing file
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn fields(&self) -> &[(&'static str, Value)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// True when every field is zero or empty
    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_empty())
    }

    pub fn u32(&self, name: &'static str) -> Result<u32> {
        self.typed(name, "a u32", Value::as_u32)
    }

    pub fn u32s(&self, name: &'static str) -> Result<&[u32]> {
        self.typed(name, "a u32 array", Value::as_u32s)
    }

    pub fn str(&self, name: &'static str) -> Result<&str> {
        self.typed(name, "a string", Value::as_str)
    }

    pub fn strs(&self, name: &'static str) -> Result<&[String]> {
        self.typed(name, "a string array", Value::as_strs)
    }

    fn typed<'a, T>(
        &'a self,
        name: &'static str,
        expected: &'static str,
        f: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T> {
        let value = self.get(name).ok_or(Error::MissingField {
            record: self.kind,
            field: name,
        })?;
        f(value).ok_or(Error::FieldType {
            record: self.kind,
            field: name,
            expected,
        })
    }

    /// Writing fields back is not implemented.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        Err(Error::Unsupported(format!(
            "setting {}.{} to {}",
            self.kind, name, value
        )))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Random-access block reader over a seekable source
pub struct BlockReader<R> {
    source: R,
    len: u64,
}

impl<R: Read + Seek> BlockReader<R> {
    pub fn new(mut source: R) -> Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        Ok(Self { source, len })
    }

    /// Total size of the source in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read one whole block at `offset` and decode it with `schema`
    pub fn read(&mut self, offset: u64, schema: &Schema) -> Result<Record> {
        self.source.seek(SeekFrom::Start(offset))?;

        let mut block = Vec::with_capacity(schema.size);
        self.source
            .by_ref()
            .take(schema.size as u64)
            .read_to_end(&mut block)?;

        if block.len() != schema.size {
            return Err(Error::ShortRead {
                offset,
                expected: schema.size,
                actual: block.len(),
            });
        }

        schema.decode(&block, offset)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}
