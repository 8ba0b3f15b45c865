//! Long File Name (LFN) support for FAT32
//!
//! Fragments are stored in descending logical order, so scanning a directory
//! forwards meets the tail of the name first. The accumulator prepends each
//! fragment, which leaves the name in reading order once ordinal 1 arrives.

use super::DIR_ENTRY_SIZE;
use super::utils::{read_u8, read_u16_le};
use crate::error::{Fat32Error, Result};

/// Set on the fragment holding the end of the name (met first on disk)
pub const LFN_LAST_LOGICAL: u8 = 0x40;

/// Low five bits of the sequence byte hold the ordinal
pub const LFN_ORDINAL_MASK: u8 = 0x1F;

/// 20 fragments of 13 units cover the 255-character name limit
pub const LFN_MAX_ORDINAL: u8 = 20;

const LFN_CHECKSUM: usize = 0x0D;

/// Name characters sit in three runs: (offset, count)
const LFN_NAME_RUNS: [(usize, usize); 3] = [(0x01, 5), (0x0E, 6), (0x1C, 2)];

/// Maximum number of characters in a LFN entry
const LFN_CHARS_PER_ENTRY: usize = 13;

/// One decoded LFN slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfnFragment {
    pub sequence: u8,
    pub checksum: u8,
    pub units: Vec<u16>,
}

impl LfnFragment {
    pub fn ordinal(&self) -> u8 {
        self.sequence & LFN_ORDINAL_MASK
    }

    pub fn is_last_logical(&self) -> bool {
        self.sequence & LFN_LAST_LOGICAL != 0
    }
}

/// Decode an LFN slot. Characters stop at the first 0x0000 or 0xFFFF.
pub fn parse_lfn_fragment(slot: &[u8]) -> Result<LfnFragment> {
    if slot.len() < DIR_ENTRY_SIZE {
        return Err(Fat32Error::decode(0, DIR_ENTRY_SIZE, slot.len()));
    }

    let mut units = Vec::with_capacity(LFN_CHARS_PER_ENTRY);
    'runs: for (start, count) in LFN_NAME_RUNS {
        for i in 0..count {
            let c = read_u16_le(slot, start + i * 2)?;
            if c == 0x0000 || c == 0xFFFF {
                break 'runs;
            }
            units.push(c);
        }
    }

    Ok(LfnFragment {
        sequence: read_u8(slot, 0)?,
        checksum: read_u8(slot, LFN_CHECKSUM)?,
        units,
    })
}

/// Checksum of an 11-byte short name, as stored in each of its LFN slots
pub fn lfn_checksum(name: &[u8; 11]) -> u8 {
    let mut sum: u8 = 0;
    for &byte in name {
        sum = sum.rotate_right(1).wrapping_add(byte);
    }
    sum
}

/// Long name under construction while a directory is scanned.
///
/// This is the only state that crosses a cluster boundary: the scan of one
/// cluster returns it and the scan of the next cluster takes it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LfnAccumulator {
    units: Vec<u16>,
    complete: bool,
    checksum: Option<u8>,
}

impl LfnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.units.clear();
        self.complete = false;
        self.checksum = None;
    }

    /// Ordinal 1 has been seen and the name is ready for the next short entry
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && !self.complete
    }

    /// Fold one fragment into the name.
    pub fn push(&mut self, fragment: LfnFragment) {
        let ordinal = fragment.ordinal();
        if ordinal == 0 || ordinal > LFN_MAX_ORDINAL {
            log::warn!(
                "LFN fragment with invalid sequence byte {:#04x}, discarding partial name",
                fragment.sequence
            );
            self.reset();
            return;
        }

        if fragment.is_last_logical() {
            self.reset();
            self.checksum = Some(fragment.checksum);
        } else if self.checksum.is_some_and(|c| c != fragment.checksum) {
            log::debug!(
                "LFN fragment {} checksum {:#04x} differs from sequence checksum",
                ordinal,
                fragment.checksum
            );
        }

        self.units.splice(0..0, fragment.units);
        if ordinal == 1 {
            self.complete = true;
        }
    }

    /// Called for every short entry: hands out the long name if one is
    /// complete and always leaves the accumulator empty.
    pub fn take_name(&mut self, short_name: &[u8; 11]) -> Option<String> {
        let name = if self.complete {
            if let Some(stored) = self.checksum {
                let expected = lfn_checksum(short_name);
                if stored != expected {
                    log::warn!(
                        "LFN checksum {:#04x} does not match short name {:?} ({:#04x})",
                        stored,
                        String::from_utf8_lossy(short_name),
                        expected
                    );
                }
            }
            Some(String::from_utf16_lossy(&self.units))
        } else {
            if !self.units.is_empty() {
                log::debug!("incomplete LFN sequence dropped before short entry");
            }
            None
        };
        self.reset();
        name
    }
}
