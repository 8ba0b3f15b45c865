pub mod bpb;
pub mod cluster;
pub mod directory;
pub mod entry;
pub mod fat_table;
pub mod file;
pub mod lfn;
pub mod utils;
pub mod volume;

pub use bpb::VolumeGeometry;
pub use directory::{DirectoryScan, parse_directory_entries};
pub use entry::{DirEntry, FileAttributes};
pub use fat_table::{ChainLink, ClusterChain};
pub use file::FileContents;
pub use lfn::{LfnAccumulator, LfnFragment};
pub use utils::{FatDate, FatDateTime};
pub use volume::{Fat32Volume, MountOptions, Resolution, split_path};

pub(crate) const BOOT_SECTOR_SIZE: usize = 512;
pub(crate) const DIR_ENTRY_SIZE: usize = 32;
pub(crate) const FAT_ENTRY_SIZE: usize = 4;

/// Cluster numbering starts at 2; 0 and 1 are reserved
pub const FIRST_DATA_CLUSTER: u32 = 2;

/// First byte of a never-used directory slot
pub(crate) const ENTRY_FREE: u8 = 0x00;
/// First byte of a deleted directory slot
pub(crate) const ENTRY_DELETED: u8 = 0xE5;
/// Stored in place of a genuine leading 0xE5 name byte
pub(crate) const ENTRY_E5_ESCAPE: u8 = 0x05;
