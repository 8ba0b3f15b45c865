//! Short (8.3) directory entry decoding

use std::fmt;

use bitflags::bitflags;

use super::utils::{FatDate, FatDateTime, read_array, read_u8, read_u16_le, read_u32_le};
use super::{DIR_ENTRY_SIZE, ENTRY_DELETED, ENTRY_E5_ESCAPE};
use crate::error::{Fat32Error, Result};

const DIR_NAME: usize = 0x00;
const DIR_ATTR: usize = 0x0B;
const DIR_CASE: usize = 0x0C;
const DIR_CRT_TIME: usize = 0x0E;
const DIR_CRT_DATE: usize = 0x10;
const DIR_ACC_DATE: usize = 0x12;
const DIR_CLUSTER_HI: usize = 0x14;
const DIR_WRT_TIME: usize = 0x16;
const DIR_WRT_DATE: usize = 0x18;
const DIR_CLUSTER_LO: usize = 0x1A;
const DIR_FILE_SIZE: usize = 0x1C;

/// VFAT case byte: base name stored upper case, display lower case
const CASE_LOWER_BASE: u8 = 0x08;
/// VFAT case byte: extension stored upper case, display lower case
const CASE_LOWER_EXT: u8 = 0x10;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        /// All four low bits together mark an LFN slot
        const LONG_NAME = 0x0F;

        // Reserved bits are kept as read
        const _ = !0;
    }
}

impl FileAttributes {
    /// Attribute byte of an LFN slot (upper two reserved bits ignored)
    pub fn is_long_name(self) -> bool {
        self.bits() & 0x3F == Self::LONG_NAME.bits()
    }
}

impl fmt::Display for FileAttributes {
    /// `dir`-style flag column, e.g. `-HS-D-`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (Self::READ_ONLY, 'R'),
            (Self::HIDDEN, 'H'),
            (Self::SYSTEM, 'S'),
            (Self::VOLUME_ID, 'V'),
            (Self::DIRECTORY, 'D'),
            (Self::ARCHIVE, 'A'),
        ];
        for (flag, c) in flags {
            if self.contains(flag) {
                write!(f, "{}", c)?;
            } else {
                f.write_str("-")?;
            }
        }
        Ok(())
    }
}

/// A resolved directory entry: one short-name slot plus its long name, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Long name when a complete LFN sequence preceded the slot, else `short_name`
    pub name: String,
    /// Display form of the 8.3 name (`hello.txt`, `README`)
    pub short_name: String,
    /// The 11 name bytes exactly as stored
    pub raw_short_name: [u8; 11],
    pub attributes: FileAttributes,
    pub first_cluster: u32,
    pub size: u32,
    pub created: FatDateTime,
    pub modified: FatDateTime,
    pub accessed: FatDate,
    pub has_long_name: bool,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.contains(FileAttributes::VOLUME_ID) && !self.is_directory()
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory() && !self.is_volume_label()
    }

    /// `.` or `..`
    pub fn is_dot_entry(&self) -> bool {
        self.raw_short_name[0] == b'.'
    }
}

/// Decode one 32-byte short-name slot. The caller filters free, deleted and
/// LFN slots before calling this.
pub fn parse_short_entry(slot: &[u8]) -> Result<DirEntry> {
    if slot.len() < DIR_ENTRY_SIZE {
        return Err(Fat32Error::decode(0, DIR_ENTRY_SIZE, slot.len()));
    }
    let raw_short_name: [u8; 11] = read_array(slot, DIR_NAME)?;
    let case = read_u8(slot, DIR_CASE)?;
    let short_name = decode_short_name(&raw_short_name, case);

    let high = read_u16_le(slot, DIR_CLUSTER_HI)? as u32;
    let low = read_u16_le(slot, DIR_CLUSTER_LO)? as u32;

    Ok(DirEntry {
        name: short_name.clone(),
        short_name,
        raw_short_name,
        attributes: FileAttributes::from_bits_retain(read_u8(slot, DIR_ATTR)?),
        first_cluster: (high << 16) | low,
        size: read_u32_le(slot, DIR_FILE_SIZE)?,
        created: FatDateTime::from_raw(
            read_u16_le(slot, DIR_CRT_DATE)?,
            read_u16_le(slot, DIR_CRT_TIME)?,
        ),
        modified: FatDateTime::from_raw(
            read_u16_le(slot, DIR_WRT_DATE)?,
            read_u16_le(slot, DIR_WRT_TIME)?,
        ),
        accessed: FatDate::from_raw(read_u16_le(slot, DIR_ACC_DATE)?),
        has_long_name: false,
    })
}

/// Render an 8.3 name for display.
///
/// Trailing spaces are trimmed from base and extension, a leading 0x05 is
/// restored to 0xE5, and the VFAT case bits lower-case ASCII letters. Bytes
/// map to the first 256 Unicode code points.
pub fn decode_short_name(raw: &[u8; 11], case: u8) -> String {
    let lower_base = case & CASE_LOWER_BASE != 0;
    let lower_ext = case & CASE_LOWER_EXT != 0;

    let trimmed = |part: &[u8]| {
        let end = part.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        part[..end].to_vec()
    };
    let mut base = trimmed(&raw[..8]);
    let ext = trimmed(&raw[8..]);

    if base.first() == Some(&ENTRY_E5_ESCAPE) {
        base[0] = ENTRY_DELETED;
    }

    let mut name = String::with_capacity(12);
    let mut push = |b: u8, lower: bool| {
        let b = if lower { b.to_ascii_lowercase() } else { b };
        name.push(char::from(b));
    };
    for &b in &base {
        push(b, lower_base);
    }
    if !ext.is_empty() {
        push(b'.', false);
        for &b in &ext {
            push(b, lower_ext);
        }
    }
    name
}
