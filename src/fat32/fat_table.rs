//! FAT chain traversal for FAT32
//!
//! Nothing is cached: every lookup re-reads the four bytes of the FAT entry.

use super::bpb::VolumeGeometry;
use super::{FAT_ENTRY_SIZE, FIRST_DATA_CLUSTER};
use crate::error::{Fat32Error, Result};
use crate::sector::SectorSource;

/// FAT32 entries only use the low 28 bits
pub const FAT32_ENTRY_MASK: u32 = 0x0FFFFFFF;

/// FAT32 end-of-chain markers start here
pub const FAT32_EOC: u32 = 0x0FFFFFF8;

/// FAT32 bad cluster marker
pub const FAT32_BAD_CLUSTER: u32 = 0x0FFFFFF7;

/// FAT32 free cluster marker
pub const FAT32_FREE_CLUSTER: u32 = 0x00000000;

/// Classified value of one FAT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLink {
    Next(u32),
    EndOfChain,
    Free,
    Bad,
}

impl ChainLink {
    /// Classify a raw FAT entry. Any value in `0x0FFFFFF8..=0x0FFFFFFF`
    /// terminates a chain, not just `0x0FFFFFFF`.
    pub fn classify(raw: u32) -> Self {
        match raw & FAT32_ENTRY_MASK {
            FAT32_FREE_CLUSTER => Self::Free,
            FAT32_BAD_CLUSTER => Self::Bad,
            v if v >= FAT32_EOC => Self::EndOfChain,
            v => Self::Next(v),
        }
    }
}

/// Read the masked FAT entry for `cluster` from the first FAT copy.
pub fn read_fat_entry<S: SectorSource>(
    source: &mut S,
    geometry: &VolumeGeometry,
    cluster: u32,
) -> Result<u32> {
    if cluster >= geometry.fat_entry_count() {
        return Err(Fat32Error::invalid_cluster(cluster));
    }
    let (sector, offset) = geometry.fat_entry_location(cluster);
    let mut entry = [0u8; FAT_ENTRY_SIZE];
    source.read_bytes(
        sector * geometry.bytes_per_sector as u64 + offset as u64,
        &mut entry,
    )?;
    Ok(u32::from_le_bytes(entry) & FAT32_ENTRY_MASK)
}

/// Next link in the chain that contains `cluster`.
pub fn next_cluster<S: SectorSource>(
    source: &mut S,
    geometry: &VolumeGeometry,
    cluster: u32,
) -> Result<ChainLink> {
    let link = ChainLink::classify(read_fat_entry(source, geometry, cluster)?);
    log::trace!("FAT[{}] -> {:?}", cluster, link);
    Ok(link)
}

/// Lazy walk over a cluster chain.
///
/// Yields each cluster number in order and stops after the cluster whose FAT
/// entry is an end-of-chain marker. A free or bad link, a link outside the
/// FAT, or a chain longer than the FAT itself (a cycle) ends the walk with
/// `MalformedChain`. A start cluster below 2 (an empty file) yields nothing.
pub struct ClusterChain<'a, S> {
    source: &'a mut S,
    geometry: VolumeGeometry,
    start: u32,
    last: Option<u32>,
    steps: u32,
    done: bool,
}

impl<'a, S: SectorSource> ClusterChain<'a, S> {
    pub fn new(source: &'a mut S, geometry: VolumeGeometry, start: u32) -> Self {
        Self {
            source,
            geometry,
            start,
            last: None,
            steps: 0,
            done: start < FIRST_DATA_CLUSTER,
        }
    }

    /// Rewind to the first cluster.
    pub fn restart(&mut self) {
        self.last = None;
        self.steps = 0;
        self.done = self.start < FIRST_DATA_CLUSTER;
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut *self.source
    }

    /// Most clusters a well-formed chain can contain.
    fn limit(&self) -> u32 {
        self.geometry
            .fat_entry_count()
            .saturating_sub(FIRST_DATA_CLUSTER)
    }

    fn fail(&mut self, message: String) -> Option<Result<u32>> {
        log::warn!("cluster chain from {}: {}", self.start, message);
        self.done = true;
        Some(Err(Fat32Error::malformed_chain(self.start, message)))
    }
}

impl<S: SectorSource> Iterator for ClusterChain<'_, S> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let cluster = match self.last {
            None => self.start,
            Some(prev) => match next_cluster(&mut *self.source, &self.geometry, prev) {
                Ok(ChainLink::Next(c)) => c,
                Ok(ChainLink::EndOfChain) => {
                    self.done = true;
                    return None;
                }
                Ok(link) => return self.fail(format!("cluster {} links to {:?}", prev, link)),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            },
        };

        if cluster < FIRST_DATA_CLUSTER || cluster >= self.geometry.fat_entry_count() {
            return self.fail(format!("cluster {} is outside the FAT", cluster));
        }

        self.steps += 1;
        if self.steps > self.limit() {
            let limit = self.limit();
            return self.fail(format!("longer than {} clusters (cycle?)", limit));
        }

        self.last = Some(cluster);
        Some(Ok(cluster))
    }
}
