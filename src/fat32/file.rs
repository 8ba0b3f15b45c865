//! Streaming file contents

use super::entry::DirEntry;
use super::fat_table::ClusterChain;
use crate::error::Result;
use crate::sector::SectorSource;

/// Lazy reader over the clusters of one file.
///
/// Each item is one cluster of data, the last one cut to the entry size. A
/// chain shorter than the recorded size ends early with a warning; a broken
/// chain ends with its error.
pub struct FileContents<'a, S> {
    chain: ClusterChain<'a, S>,
    remaining: u64,
}

impl<'a, S: SectorSource> FileContents<'a, S> {
    pub(crate) fn new(chain: ClusterChain<'a, S>, entry: &DirEntry) -> Self {
        Self {
            chain,
            remaining: entry.size as u64,
        }
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn read_block(&mut self, cluster: u32) -> Result<Vec<u8>> {
        let geometry = *self.chain.geometry();
        let len = (geometry.cluster_size() as u64).min(self.remaining) as usize;
        let offset = geometry.cluster_offset(cluster)?;

        let mut block = vec![0u8; len];
        self.chain.source_mut().read_bytes(offset, &mut block)?;
        self.remaining -= len as u64;
        log::trace!(
            "file block: cluster {} ({} bytes, {} left)",
            cluster,
            len,
            self.remaining
        );
        Ok(block)
    }
}

impl<S: SectorSource> Iterator for FileContents<'_, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let result = match self.chain.next() {
            Some(Ok(cluster)) => self.read_block(cluster),
            Some(Err(e)) => Err(e),
            None => {
                log::warn!(
                    "cluster chain from {} ended with {} bytes unread",
                    self.chain.start(),
                    self.remaining
                );
                self.remaining = 0;
                return None;
            }
        };

        if result.is_err() {
            self.remaining = 0;
        }
        Some(result)
    }
}
