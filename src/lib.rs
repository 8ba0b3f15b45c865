//! fat32-inspect: a read-only FAT32 inspector
//!
//! Resolves paths on a FAT32 volume by decoding the boot sector, the File
//! Allocation Table and directory clusters directly, without a filesystem
//! driver. Nothing is ever written to the device.
//!
//! ```no_run
//! use fat32_inspect::{Fat32Volume, split_path};
//!
//! let mut volume = Fat32Volume::open("/dev/sdb1")?;
//! if let Some(entry) = volume.find_file(&split_path("EFI/BOOT/BOOTX64.EFI"))? {
//!     println!("{} bytes at cluster {}", entry.size, entry.first_cluster);
//! }
//! # Ok::<(), fat32_inspect::Fat32Error>(())
//! ```

pub mod error;
pub mod fat32;
pub mod platform;
pub mod sector;

// Re-export main types
pub use error::{Fat32Error, Result};
pub use fat32::{
    ChainLink, DirEntry, Fat32Volume, FileAttributes, MountOptions, Resolution, VolumeGeometry,
    split_path,
};
pub use sector::{DeviceSource, SectorSource};
