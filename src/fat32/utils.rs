//! Bounds-checked little-endian field decoders and FAT date/time unpacking

use std::fmt;

use crate::error::{Fat32Error, Result};

fn field(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| Fat32Error::decode(offset, len, buf.len()))
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    Ok(field(buf, offset, 1)?[0])
}

pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16> {
    let b = field(buf, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    let b = field(buf, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Copy a fixed-size byte array out of `buf`
pub fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(field(buf, offset, N)?);
    Ok(out)
}

/// Packed FAT date: bits 15-9 year since 1980, 8-5 month, 4-0 day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl FatDate {
    pub fn from_raw(raw: u16) -> Self {
        Self {
            year: ((raw & 0xFE00) >> 9) + 1980,
            month: ((raw & 0x01E0) >> 5) as u8,
            day: (raw & 0x001F) as u8,
        }
    }

    /// Zero date fields mean "never set"
    pub fn is_unset(&self) -> bool {
        self.month == 0 && self.day == 0
    }
}

impl fmt::Display for FatDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Packed FAT date and time. Time: bits 15-11 hour, 10-5 minute, 4-0 seconds/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatDateTime {
    pub date: FatDate,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl FatDateTime {
    pub fn from_raw(date: u16, time: u16) -> Self {
        Self {
            date: FatDate::from_raw(date),
            hour: ((time & 0xF800) >> 11) as u8,
            minute: ((time & 0x07E0) >> 5) as u8,
            second: ((time & 0x001F) << 1) as u8,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.date.is_unset()
    }
}

impl fmt::Display for FatDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}:{:02}",
            self.date, self.hour, self.minute, self.second
        )
    }
}
