//! Cluster and sector address translation

use super::bpb::VolumeGeometry;
use super::{FAT_ENTRY_SIZE, FIRST_DATA_CLUSTER};
use crate::error::{Fat32Error, Result};

impl VolumeGeometry {
    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * self.bytes_per_sector as usize
    }

    /// First sector of the data region (two FATs assumed).
    pub fn data_start_sector(&self) -> u64 {
        self.reserved_sectors as u64 + 2 * self.sectors_per_fat as u64
    }

    /// Inclusive sector range `(first, last)` occupied by `cluster`.
    pub fn cluster_to_sectors(&self, cluster: u32) -> Result<(u32, u32)> {
        let first = self.cluster_first_sector(cluster)?;
        let last = first + self.sectors_per_cluster as u64 - 1;
        let first = u32::try_from(first).map_err(|_| Fat32Error::invalid_cluster(cluster))?;
        let last = u32::try_from(last).map_err(|_| Fat32Error::invalid_cluster(cluster))?;
        Ok((first, last))
    }

    /// Byte offset of `cluster` from the start of the volume.
    pub fn cluster_offset(&self, cluster: u32) -> Result<u64> {
        Ok(self.cluster_first_sector(cluster)? * self.bytes_per_sector as u64)
    }

    fn cluster_first_sector(&self, cluster: u32) -> Result<u64> {
        if cluster < FIRST_DATA_CLUSTER || cluster < self.root_cluster {
            return Err(Fat32Error::invalid_cluster(cluster));
        }
        let index = (cluster - self.root_cluster) as u64;
        Ok(self.data_start_sector() + index * self.sectors_per_cluster as u64)
    }

    /// `(sector, byte offset within sector)` of the FAT entry for `cluster`.
    pub fn fat_entry_location(&self, cluster: u32) -> (u64, usize) {
        let byte = cluster as u64 * FAT_ENTRY_SIZE as u64;
        let bps = self.bytes_per_sector as u64;
        (
            self.reserved_sectors as u64 + byte / bps,
            (byte % bps) as usize,
        )
    }

    /// Number of 32-bit entries one FAT copy can hold.
    pub fn fat_entry_count(&self) -> u32 {
        let bytes = self.sectors_per_fat as u64 * self.bytes_per_sector as u64;
        (bytes / FAT_ENTRY_SIZE as u64).min(u32::MAX as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> VolumeGeometry {
        VolumeGeometry {
            bytes_per_sector: 512,
            sectors_per_cluster: 8,
            reserved_sectors: 32,
            sectors_per_fat: 1000,
            root_cluster: 2,
            num_fats: 2,
            total_sectors: 0,
        }
    }

    #[test]
    fn root_cluster_starts_data_region() {
        let g = geometry();
        assert_eq!(g.cluster_to_sectors(2).unwrap(), (2032, 2039));
        assert_eq!(g.cluster_offset(2).unwrap(), 2032 * 512);
    }

    #[test]
    fn later_clusters_are_contiguous() {
        let g = geometry();
        assert_eq!(g.cluster_to_sectors(3).unwrap(), (2040, 2047));
        assert_eq!(g.cluster_to_sectors(12).unwrap(), (2112, 2119));
        assert_eq!(g.cluster_size(), 4096);
    }

    #[test]
    fn reserved_clusters_rejected() {
        let g = geometry();
        assert!(matches!(
            g.cluster_to_sectors(0),
            Err(Fat32Error::InvalidCluster { cluster: 0 })
        ));
        assert!(g.cluster_to_sectors(1).is_err());
    }

    #[test]
    fn data_region_is_indexed_from_root_cluster() {
        let g = VolumeGeometry {
            bytes_per_sector: 512,
            sectors_per_cluster: 4,
            reserved_sectors: 10,
            sectors_per_fat: 7,
            root_cluster: 5,
            num_fats: 2,
            total_sectors: 0,
        };
        assert_eq!(g.cluster_to_sectors(5).unwrap(), (24, 27));
        assert_eq!(g.cluster_to_sectors(6).unwrap(), (28, 31));
        for cluster in 2..5 {
            assert!(matches!(
                g.cluster_to_sectors(cluster),
                Err(Fat32Error::InvalidCluster { cluster: c }) if c == cluster
            ));
        }
    }

    #[test]
    fn fat_entry_lookup() {
        let g = geometry();
        assert_eq!(g.fat_entry_location(2), (32, 8));
        assert_eq!(g.fat_entry_location(128), (33, 0));
        assert_eq!(g.fat_entry_location(130), (33, 8));
        assert_eq!(g.fat_entry_count(), 128_000);
    }
}
