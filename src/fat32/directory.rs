//! Directory cluster scanning

use super::entry::{DirEntry, FileAttributes, parse_short_entry};
use super::lfn::{LfnAccumulator, parse_lfn_fragment};
use super::{DIR_ENTRY_SIZE, ENTRY_DELETED, ENTRY_FREE};
use crate::error::Result;

const DIR_ATTR_OFFSET: usize = 0x0B;

/// Lazy scan of one directory cluster.
///
/// Yields short-name entries with their long names attached. LFN slots are
/// consumed silently; free and deleted slots reset the pending long name.
/// Once exhausted, [`DirectoryScan::into_state`] returns the pending long
/// name so the scan of the next cluster in the chain can continue it.
pub struct DirectoryScan<'a> {
    cluster: &'a [u8],
    offset: usize,
    lfn: LfnAccumulator,
}

impl<'a> DirectoryScan<'a> {
    pub fn new(cluster: &'a [u8], lfn: LfnAccumulator) -> Self {
        Self {
            cluster,
            offset: 0,
            lfn,
        }
    }

    pub fn into_state(self) -> LfnAccumulator {
        self.lfn
    }
}

impl Iterator for DirectoryScan<'_> {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset + DIR_ENTRY_SIZE <= self.cluster.len() {
            let slot = &self.cluster[self.offset..self.offset + DIR_ENTRY_SIZE];
            self.offset += DIR_ENTRY_SIZE;

            if slot[0] == ENTRY_FREE || slot[0] == ENTRY_DELETED {
                self.lfn.reset();
                continue;
            }

            if FileAttributes::from_bits_retain(slot[DIR_ATTR_OFFSET]).is_long_name() {
                match parse_lfn_fragment(slot) {
                    Ok(fragment) => self.lfn.push(fragment),
                    Err(e) => return Some(Err(e)),
                }
                continue;
            }

            let mut entry = match parse_short_entry(slot) {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            if let Some(long_name) = self.lfn.take_name(&entry.raw_short_name) {
                entry.name = long_name;
                entry.has_long_name = true;
            }
            return Some(Ok(entry));
        }
        None
    }
}

/// Decode every entry of a single cluster with no carried-in long name.
pub fn parse_directory_entries(cluster_data: &[u8]) -> Result<Vec<DirEntry>> {
    DirectoryScan::new(cluster_data, LfnAccumulator::new()).collect()
}
