//! Boot sector (BIOS Parameter Block) decoding

use super::utils::{read_u8, read_u16_le, read_u32_le};
use super::{BOOT_SECTOR_SIZE, FIRST_DATA_CLUSTER};
use crate::error::{Fat32Error, Result};
use crate::sector::SectorSource;

const BPB_BYTES_PER_SECTOR: usize = 0x0B;
const BPB_SECTORS_PER_CLUSTER: usize = 0x0D;
const BPB_RESERVED_SECTORS: usize = 0x0E;
const BPB_NUM_FATS: usize = 0x10;
const BPB_TOTAL_SECTORS_32: usize = 0x20;
const BPB_SECTORS_PER_FAT_32: usize = 0x24;
const BPB_ROOT_CLUSTER: usize = 0x2C;

/// Volume geometry, fixed for the lifetime of a mounted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
    /// Reported only; addressing always assumes two FATs.
    pub num_fats: u8,
    pub total_sectors: u32,
}

/// Decode the geometry fields of a boot sector.
///
/// The filesystem signature is not checked. Geometry is rejected only when
/// the address arithmetic would be meaningless.
pub fn parse_bpb(sector: &[u8]) -> Result<VolumeGeometry> {
    let geometry = VolumeGeometry {
        bytes_per_sector: read_u16_le(sector, BPB_BYTES_PER_SECTOR)?,
        sectors_per_cluster: read_u8(sector, BPB_SECTORS_PER_CLUSTER)?,
        reserved_sectors: read_u16_le(sector, BPB_RESERVED_SECTORS)?,
        num_fats: read_u8(sector, BPB_NUM_FATS)?,
        total_sectors: read_u32_le(sector, BPB_TOTAL_SECTORS_32)?,
        sectors_per_fat: read_u32_le(sector, BPB_SECTORS_PER_FAT_32)?,
        root_cluster: read_u32_le(sector, BPB_ROOT_CLUSTER)?,
    };
    geometry.validate()?;
    Ok(geometry)
}

/// Read the first sector of `source` and decode it.
pub fn read_bpb<S: SectorSource>(source: &mut S) -> Result<VolumeGeometry> {
    let mut sector = [0u8; BOOT_SECTOR_SIZE];
    source.read_bytes(0, &mut sector)?;
    parse_bpb(&sector)
}

impl VolumeGeometry {
    fn validate(&self) -> Result<()> {
        let bps = self.bytes_per_sector;
        if bps < 32 || bps % 32 != 0 {
            return Err(Fat32Error::invalid_fat32(format!(
                "bytes per sector {} is not a positive multiple of 32",
                bps
            )));
        }
        if self.sectors_per_cluster == 0 {
            return Err(Fat32Error::invalid_fat32("sectors per cluster is 0"));
        }
        if self.sectors_per_fat == 0 {
            return Err(Fat32Error::invalid_fat32(
                "sectors per FAT is 0 (FAT12/16 volume?)",
            ));
        }
        if self.root_cluster < FIRST_DATA_CLUSTER {
            return Err(Fat32Error::invalid_fat32(format!(
                "root cluster {} is below the first data cluster",
                self.root_cluster
            )));
        }
        Ok(())
    }
}
