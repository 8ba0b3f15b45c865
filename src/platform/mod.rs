//! Platform-specific device naming

use std::path::PathBuf;

/// Map a user-facing device identifier to a path `File::open` accepts.
///
/// On Windows a bare drive letter (`J`, `J:`, `J:\`) becomes the raw volume
/// path `\\.\J:`. Everything else, and every identifier on other platforms,
/// is used as given.
pub fn device_path(identifier: &str) -> PathBuf {
    #[cfg(windows)]
    {
        if let Some(path) = windows_volume_path(identifier) {
            return PathBuf::from(path);
        }
    }
    PathBuf::from(identifier)
}

/// `\\.\X:` for a drive-letter identifier, `None` for anything else.
pub fn windows_volume_path(identifier: &str) -> Option<String> {
    let mut chars = identifier.chars();
    let drive = chars.next()?;
    if !drive.is_ascii_alphabetic() {
        return None;
    }
    match chars.as_str() {
        "" | ":" | ":\\" | ":/" => Some(format!("\\\\.\\{}:", drive.to_ascii_uppercase())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_letters_map_to_volume_paths() {
        assert_eq!(windows_volume_path("J:").as_deref(), Some(r"\\.\J:"));
        assert_eq!(windows_volume_path("j").as_deref(), Some(r"\\.\J:"));
        assert_eq!(windows_volume_path("C:\\").as_deref(), Some(r"\\.\C:"));
    }

    #[test]
    fn other_identifiers_are_untouched() {
        assert_eq!(windows_volume_path("/dev/sdb1"), None);
        assert_eq!(windows_volume_path("disk.img"), None);
        assert_eq!(windows_volume_path("C:\\images\\esp.img"), None);
        assert_eq!(windows_volume_path(""), None);
    }

    #[cfg(not(windows))]
    #[test]
    fn unix_paths_pass_through() {
        assert_eq!(device_path("/dev/sdb1"), PathBuf::from("/dev/sdb1"));
        assert_eq!(device_path("J:"), PathBuf::from("J:"));
    }
}
