//! Error types for the fat32-inspect library

use std::fmt;
use std::io;

/// Result type for fat32-inspect operations
pub type Result<T> = std::result::Result<T, Fat32Error>;

/// Main error type for fat32-inspect operations.
///
/// Only structural failures live here. A path that simply does not exist is
/// reported through the lookup return value, not as an error.
#[derive(Debug)]
pub enum Fat32Error {
    /// I/O error from the underlying device
    Io(io::Error),

    /// The device returned fewer bytes than requested
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// Boot sector geometry that cannot describe a FAT32 volume
    InvalidFat32 { message: String },

    /// Cluster number outside the data region
    InvalidCluster { cluster: u32 },

    /// Cluster chain that loops, runs past the FAT, or hits a free/bad link
    MalformedChain { start: u32, message: String },

    /// A field decoder ran past the end of its buffer
    Decode {
        offset: usize,
        len: usize,
        available: usize,
    },
}

impl fmt::Display for Fat32Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::ShortRead {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "Short read at offset {:#x}: expected {} bytes, got {}",
                offset, expected, actual
            ),
            Self::InvalidFat32 { message } => write!(f, "Invalid FAT32: {}", message),
            Self::InvalidCluster { cluster } => {
                write!(f, "Invalid cluster number {} (must be >= 2)", cluster)
            }
            Self::MalformedChain { start, message } => {
                write!(f, "Malformed cluster chain starting at {}: {}", start, message)
            }
            Self::Decode {
                offset,
                len,
                available,
            } => write!(
                f,
                "Field of {} bytes at offset {:#x} exceeds buffer of {} bytes",
                len, offset, available
            ),
        }
    }
}

impl std::error::Error for Fat32Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Fat32Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// Convenience constructors
impl Fat32Error {
    pub fn invalid_fat32(message: impl Into<String>) -> Self {
        Self::InvalidFat32 {
            message: message.into(),
        }
    }

    pub fn short_read(offset: u64, expected: usize, actual: usize) -> Self {
        Self::ShortRead {
            offset,
            expected,
            actual,
        }
    }

    pub fn invalid_cluster(cluster: u32) -> Self {
        Self::InvalidCluster { cluster }
    }

    pub fn malformed_chain(start: u32, message: impl Into<String>) -> Self {
        Self::MalformedChain {
            start,
            message: message.into(),
        }
    }

    pub fn decode(offset: usize, len: usize, available: usize) -> Self {
        Self::Decode {
            offset,
            len,
            available,
        }
    }

    /// True for errors raised by the device rather than by on-disk contents
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ShortRead { .. })
    }
}
