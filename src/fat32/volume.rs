//! Mounted volume session and path resolution

use std::fs::File;

use super::FIRST_DATA_CLUSTER;
use super::bpb::{VolumeGeometry, read_bpb};
use super::directory::DirectoryScan;
use super::entry::DirEntry;
use super::fat_table::{self, ChainLink, ClusterChain};
use super::file::FileContents;
use super::lfn::LfnAccumulator;
use crate::error::{Fat32Error, Result};
use crate::platform;
use crate::sector::{DeviceSource, SectorSource};

/// Knobs for [`Fat32Volume::open_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountOptions {
    /// Byte offset of the FAT32 volume inside the device or image
    pub partition_offset: u64,
}

/// Outcome of resolving a path.
///
/// `depth` is the index of the path component at which resolution stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(DirEntry),
    /// No entry named `path[depth]` in the directory reached so far
    NotFound { depth: usize },
    /// `path[depth]` names a file but more components follow it
    NotADirectory { depth: usize, entry: DirEntry },
}

impl Resolution {
    pub fn found(self) -> Option<DirEntry> {
        match self {
            Self::Found(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// A read-only FAT32 session over a [`SectorSource`].
///
/// Geometry is read once at mount. Directory clusters and FAT sectors are
/// re-read on every lookup; one cluster-sized buffer is reused for
/// directory scans.
pub struct Fat32Volume<S> {
    source: S,
    geometry: VolumeGeometry,
    cluster_buf: Vec<u8>,
}

impl Fat32Volume<DeviceSource<File>> {
    /// Open a device or image read-only. `device` may be a drive letter
    /// (`J:`) on Windows or any path.
    pub fn open(device: &str) -> Result<Self> {
        Self::open_with(device, MountOptions::default())
    }

    pub fn open_with(device: &str, options: MountOptions) -> Result<Self> {
        let path = platform::device_path(device);
        log::debug!(
            "open: {} (partition offset {:#x})",
            path.display(),
            options.partition_offset
        );
        let file = File::open(&path)?;
        Self::from_source(DeviceSource::with_offset(file, options.partition_offset))
    }
}

impl<S: SectorSource> Fat32Volume<S> {
    /// Mount any byte source whose offset 0 is the boot sector.
    pub fn from_source(mut source: S) -> Result<Self> {
        let geometry = read_bpb(&mut source)?;
        log::info!(
            "BPB: bytes_per_sector={}, sectors_per_cluster={}, reserved_sectors={}, num_fats={}, sectors_per_fat={}, root_cluster={}",
            geometry.bytes_per_sector,
            geometry.sectors_per_cluster,
            geometry.reserved_sectors,
            geometry.num_fats,
            geometry.sectors_per_fat,
            geometry.root_cluster
        );
        Ok(Self {
            source,
            cluster_buf: vec![0u8; geometry.cluster_size()],
            geometry,
        })
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn root_cluster(&self) -> u32 {
        self.geometry.root_cluster
    }

    /// End the session and hand back the source.
    pub fn close(self) -> S {
        self.source
    }

    pub fn cluster_to_sectors(&self, cluster: u32) -> Result<(u32, u32)> {
        self.geometry.cluster_to_sectors(cluster)
    }

    pub fn next_cluster(&mut self, cluster: u32) -> Result<ChainLink> {
        fat_table::next_cluster(&mut self.source, &self.geometry, cluster)
    }

    /// Lazy walk of the chain starting at `first_cluster`. Calling this
    /// again starts a fresh walk.
    pub fn cluster_chain(&mut self, first_cluster: u32) -> ClusterChain<'_, S> {
        ClusterChain::new(&mut self.source, self.geometry, first_cluster)
    }

    /// Read one cluster into the session buffer.
    pub fn read_cluster(&mut self, cluster: u32) -> Result<&[u8]> {
        let offset = self.geometry.cluster_offset(cluster)?;
        self.source.read_bytes(offset, &mut self.cluster_buf)?;
        Ok(&self.cluster_buf)
    }

    pub fn list_root(&mut self) -> Result<Vec<DirEntry>> {
        self.list_directory(self.geometry.root_cluster)
    }

    /// Every entry of the directory whose chain starts at `first_cluster`,
    /// dot entries and volume labels included. Cluster 0 means the root.
    pub fn list_directory(&mut self, first_cluster: u32) -> Result<Vec<DirEntry>> {
        let start = self.directory_start(first_cluster);
        let mut entries = Vec::new();
        let mut lfn = LfnAccumulator::new();
        let mut cluster = start;
        let mut steps = 0;

        loop {
            steps += 1;
            self.check_steps(start, steps)?;
            self.read_cluster(cluster)?;

            let mut scan = DirectoryScan::new(&self.cluster_buf, lfn);
            for entry in scan.by_ref() {
                entries.push(entry?);
            }
            lfn = scan.into_state();

            match self.next_directory_cluster(start, cluster)? {
                Some(next) => cluster = next,
                None => break,
            }
        }

        log::debug!(
            "list_directory: {} entries in chain from cluster {}",
            entries.len(),
            start
        );
        Ok(entries)
    }

    /// Look up a path given as components, starting at the root directory.
    /// Names compare exactly, case included.
    pub fn find_file<P: AsRef<str>>(&mut self, path: &[P]) -> Result<Option<DirEntry>> {
        Ok(self.resolve(path)?.found())
    }

    /// Walk `path` one component at a time.
    ///
    /// Each directory is scanned cluster by cluster, with the pending long
    /// name carried from one cluster to the next. A match on a directory
    /// with components left descends into it; a match on a file with
    /// components left stops with `NotADirectory`. A directory chain that
    /// ends on an end-of-chain, free or bad link without a match gives
    /// `NotFound`.
    pub fn resolve<P: AsRef<str>>(&mut self, path: &[P]) -> Result<Resolution> {
        if path.is_empty() {
            log::debug!("resolve: empty path");
            return Ok(Resolution::NotFound { depth: 0 });
        }

        let mut depth = 0;
        let mut dir_start = self.geometry.root_cluster;
        let mut cluster = dir_start;
        let mut steps = 0;
        let mut lfn = LfnAccumulator::new();

        loop {
            steps += 1;
            self.check_steps(dir_start, steps)?;

            let component = path[depth].as_ref();
            log::debug!("resolve: scanning cluster {} for '{}'", cluster, component);
            self.read_cluster(cluster)?;

            let mut scan = DirectoryScan::new(&self.cluster_buf, lfn);
            let mut matched = None;
            for entry in scan.by_ref() {
                let entry = entry?;
                if !entry.is_volume_label() && entry.name == component {
                    matched = Some(entry);
                    break;
                }
            }
            lfn = scan.into_state();

            let Some(entry) = matched else {
                match self.next_directory_cluster(dir_start, cluster)? {
                    Some(next) => {
                        cluster = next;
                        continue;
                    }
                    None => {
                        log::debug!("resolve: '{}' not found", component);
                        return Ok(Resolution::NotFound { depth });
                    }
                }
            };

            if depth + 1 == path.len() {
                log::debug!(
                    "resolve: found '{}' (cluster {}, {} bytes)",
                    entry.name,
                    entry.first_cluster,
                    entry.size
                );
                return Ok(Resolution::Found(entry));
            }

            if !entry.is_directory() {
                log::debug!("resolve: '{}' is not a directory", entry.name);
                return Ok(Resolution::NotADirectory { depth, entry });
            }

            depth += 1;
            dir_start = self.directory_start(entry.first_cluster);
            cluster = dir_start;
            steps = 0;
            lfn = LfnAccumulator::new();
            log::debug!(
                "resolve: descending into '{}' at cluster {}",
                entry.name,
                dir_start
            );
        }
    }

    /// Lazy cluster-sized blocks of a file, truncated to `entry.size`.
    pub fn read_file_contents(&mut self, entry: &DirEntry) -> FileContents<'_, S> {
        let chain = ClusterChain::new(&mut self.source, self.geometry, entry.first_cluster);
        FileContents::new(chain, entry)
    }

    /// Whole file in memory.
    pub fn read_file(&mut self, entry: &DirEntry) -> Result<Vec<u8>> {
        let mut content = Vec::with_capacity(entry.size as usize);
        for block in self.read_file_contents(entry) {
            content.extend_from_slice(&block?);
        }
        Ok(content)
    }

    /// A first cluster of 0 in a directory entry (`..` of a top-level
    /// directory) refers to the root.
    fn directory_start(&self, first_cluster: u32) -> u32 {
        if first_cluster == 0 {
            self.geometry.root_cluster
        } else {
            first_cluster
        }
    }

    fn check_steps(&self, start: u32, steps: u32) -> Result<()> {
        let limit = self
            .geometry
            .fat_entry_count()
            .saturating_sub(FIRST_DATA_CLUSTER);
        if steps > limit {
            log::warn!("directory chain from {} exceeds {} clusters", start, limit);
            return Err(Fat32Error::malformed_chain(
                start,
                format!("directory longer than {} clusters (cycle?)", limit),
            ));
        }
        Ok(())
    }

    /// Follow a directory chain one link. `None` once the directory ends.
    fn next_directory_cluster(&mut self, start: u32, cluster: u32) -> Result<Option<u32>> {
        match self.next_cluster(cluster)? {
            ChainLink::Next(next)
                if next >= FIRST_DATA_CLUSTER && next < self.geometry.fat_entry_count() =>
            {
                Ok(Some(next))
            }
            ChainLink::Next(next) => Err(Fat32Error::malformed_chain(
                start,
                format!("cluster {} links to {} outside the FAT", cluster, next),
            )),
            ChainLink::EndOfChain => Ok(None),
            link => {
                log::warn!(
                    "directory chain from {}: cluster {} links to {:?}",
                    start,
                    cluster,
                    link
                );
                Ok(None)
            }
        }
    }
}

/// Split a user-supplied path on `/` and `\`, dropping empty components.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat32::entry::tests::short_slot;
    use crate::fat32::lfn::lfn_checksum;
    use crate::fat32::lfn::tests::lfn_slot;
    use std::io::Cursor;

    const EOC: u32 = 0x0FFFFFFF;
    const SLOTS_PER_CLUSTER: usize = 16;

    /// 512-byte sectors, 1 sector per cluster, 1 reserved sector, two
    /// single-sector FATs (128 entries), root at cluster 2.
    struct Image {
        bytes: Vec<u8>,
    }

    impl Image {
        fn new() -> Self {
            let mut bytes = vec![0u8; 512 * 130];
            bytes[0x0B..0x0D].copy_from_slice(&512u16.to_le_bytes());
            bytes[0x0D] = 1;
            bytes[0x0E..0x10].copy_from_slice(&1u16.to_le_bytes());
            bytes[0x10] = 2;
            bytes[0x24..0x28].copy_from_slice(&1u32.to_le_bytes());
            bytes[0x2C..0x30].copy_from_slice(&2u32.to_le_bytes());
            let mut image = Self { bytes };
            image.link(2, EOC);
            image
        }

        fn link(&mut self, cluster: u32, next: u32) -> &mut Self {
            let off = 512 + cluster as usize * 4;
            self.bytes[off..off + 4].copy_from_slice(&next.to_le_bytes());
            self
        }

        fn cluster_mut(&mut self, cluster: u32) -> &mut [u8] {
            let off = (3 + cluster as usize - 2) * 512;
            &mut self.bytes[off..off + 512]
        }

        fn slots(&mut self, cluster: u32, first_slot: usize, slots: &[[u8; 32]]) -> &mut Self {
            let data = self.cluster_mut(cluster);
            for (i, slot) in slots.iter().enumerate() {
                let off = (first_slot + i) * 32;
                data[off..off + 32].copy_from_slice(slot);
            }
            self
        }

        fn volume(&self) -> Fat32Volume<DeviceSource<Cursor<Vec<u8>>>> {
            Fat32Volume::from_source(DeviceSource::new(Cursor::new(self.bytes.clone()))).unwrap()
        }
    }

    fn dir(name: &[u8; 11], cluster: u32) -> [u8; 32] {
        short_slot(name, 0x10, 0x08, cluster, 0)
    }

    fn dot_entries(own: u32, parent: u32) -> [[u8; 32]; 2] {
        [
            short_slot(b".          ", 0x10, 0, own, 0),
            short_slot(b"..         ", 0x10, 0, parent, 0),
        ]
    }

    /// root/dir1/dir2/file.txt, with file.txt spanning clusters 5 and 6
    fn nested_image() -> Image {
        let mut image = Image::new();
        image
            .slots(2, 0, &[dir(b"DIR1       ", 3)])
            .slots(3, 0, &dot_entries(3, 0))
            .slots(3, 2, &[dir(b"DIR2       ", 4)])
            .slots(4, 0, &dot_entries(4, 3))
            .slots(4, 2, &[short_slot(b"FILE    TXT", 0x20, 0x18, 5, 600)])
            .link(3, EOC)
            .link(4, EOC)
            .link(5, 6)
            .link(6, EOC);
        for (i, b) in image.cluster_mut(5).iter_mut().enumerate() {
            *b = i as u8;
        }
        image.cluster_mut(6).fill(0xAB);
        image
    }

    #[test]
    fn resolves_three_levels() {
        let mut volume = nested_image().volume();
        let entry = volume
            .find_file(&["dir1", "dir2", "file.txt"])
            .unwrap()
            .expect("file.txt");
        assert_eq!(entry.size, 600);
        assert_eq!(entry.first_cluster, 5);
        assert!(entry.is_file());
    }

    #[test]
    fn missing_component_is_not_found() {
        let mut volume = nested_image().volume();
        assert_eq!(volume.find_file(&["dir1", "missing.txt"]).unwrap(), None);
        assert_eq!(
            volume.resolve(&["dir1", "missing.txt"]).unwrap(),
            Resolution::NotFound { depth: 1 }
        );
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut volume = nested_image().volume();
        assert_eq!(volume.find_file(&["DIR1"]).unwrap(), None);
    }

    #[test]
    fn directory_can_be_final_component() {
        let mut volume = nested_image().volume();
        let entry = volume.find_file(&["dir1", "dir2"]).unwrap().unwrap();
        assert!(entry.is_directory());
        assert_eq!(entry.first_cluster, 4);
    }

    #[test]
    fn file_in_the_middle_of_a_path() {
        let mut volume = nested_image().volume();
        match volume.resolve(&["dir1", "dir2", "file.txt", "more"]).unwrap() {
            Resolution::NotADirectory { depth, entry } => {
                assert_eq!(depth, 2);
                assert_eq!(entry.name, "file.txt");
            }
            other => panic!("expected NotADirectory, got {:?}", other),
        }
    }

    #[test]
    fn dotdot_with_zero_cluster_is_root() {
        let mut volume = nested_image().volume();
        let entry = volume
            .find_file(&["dir1", "..", "dir1", "dir2", "..", "dir2"])
            .unwrap()
            .unwrap();
        assert_eq!(entry.first_cluster, 4);
    }

    #[test]
    fn empty_path_is_not_found() {
        let mut volume = nested_image().volume();
        let empty: [&str; 0] = [];
        assert_eq!(
            volume.resolve(&empty).unwrap(),
            Resolution::NotFound { depth: 0 }
        );
    }

    #[test]
    fn match_in_second_directory_cluster() {
        let mut image = Image::new();
        let filler: Vec<[u8; 32]> = (0..SLOTS_PER_CLUSTER)
            .map(|i| {
                let mut name = *b"FILL00  BIN";
                name[4] = b'0' + (i / 10) as u8;
                name[5] = b'0' + (i % 10) as u8;
                short_slot(&name, 0x20, 0, 0, 0)
            })
            .collect();
        image
            .slots(2, 0, &filler)
            .link(2, 9)
            .slots(9, 0, &[short_slot(b"TARGET  DAT", 0x20, 0, 10, 42)])
            .link(9, EOC);

        let mut volume = image.volume();
        let entry = volume.find_file(&["TARGET.DAT"]).unwrap().unwrap();
        assert_eq!(entry.size, 42);
        assert_eq!(volume.list_root().unwrap().len(), SLOTS_PER_CLUSTER + 1);
    }

    #[test]
    fn long_name_split_across_directory_clusters() {
        let short = *b"LONGNA~1TXT";
        let sum = lfn_checksum(&short);
        let mut image = Image::new();
        image
            .slots(
                2,
                SLOTS_PER_CLUSTER - 2,
                &[
                    lfn_slot(0x42, sum, "File Name.txt"),
                    lfn_slot(0x01, sum, "A Really Long"),
                ],
            )
            .link(2, 7)
            .slots(7, 0, &[short_slot(&short, 0x20, 0, 8, 5)])
            .link(7, EOC);
        // Fill the rest of cluster 2 so nothing resets the pending name
        for i in 0..SLOTS_PER_CLUSTER - 2 {
            let mut name = *b"PAD00      ";
            name[3] = b'0' + (i / 10) as u8;
            name[4] = b'0' + (i % 10) as u8;
            image.slots(2, i, &[short_slot(&name, 0x20, 0, 0, 0)]);
        }

        let mut volume = image.volume();
        let entry = volume
            .find_file(&["A Really LongFile Name.txt"])
            .unwrap()
            .unwrap();
        assert!(entry.has_long_name);
        assert_eq!(entry.short_name, "LONGNA~1.TXT");
    }

    #[test]
    fn deleted_entries_never_match() {
        let short = *b"GONE    TXT";
        let sum = lfn_checksum(&short);
        let mut deleted = short_slot(&short, 0x20, 0, 11, 5);
        deleted[0] = 0xE5;
        let mut image = Image::new();
        image.slots(2, 0, &[lfn_slot(0x41, sum, "gone.txt"), deleted]);

        let mut volume = image.volume();
        assert_eq!(volume.find_file(&["gone.txt"]).unwrap(), None);
        assert!(volume.list_root().unwrap().is_empty());
    }

    #[test]
    fn volume_label_never_matches() {
        let mut image = Image::new();
        image.slots(2, 0, &[short_slot(b"MYDISK     ", 0x08, 0, 0, 0)]);
        let mut volume = image.volume();
        assert_eq!(volume.find_file(&["MYDISK"]).unwrap(), None);
    }

    #[test]
    fn cyclic_directory_chain_is_an_error() {
        let mut image = Image::new();
        image.link(2, 8).link(8, 2);
        let mut volume = image.volume();
        assert!(matches!(
            volume.find_file(&["nothing"]),
            Err(Fat32Error::MalformedChain { start: 2, .. })
        ));
        assert!(volume.list_root().is_err());
    }

    #[test]
    fn free_link_ends_directory() {
        let mut image = Image::new();
        image.link(2, 12);
        let mut volume = image.volume();
        assert_eq!(
            volume.resolve(&["x"]).unwrap(),
            Resolution::NotFound { depth: 0 }
        );
    }

    #[test]
    fn file_contents_are_truncated_to_size() {
        let mut volume = nested_image().volume();
        let entry = volume
            .find_file(&["dir1", "dir2", "file.txt"])
            .unwrap()
            .unwrap();

        let sizes: Vec<usize> = volume
            .read_file_contents(&entry)
            .map(|block| block.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![512, 88]);

        let data = volume.read_file(&entry).unwrap();
        assert_eq!(data.len(), 600);
        assert_eq!(data[255], 255);
        assert_eq!(data[256], 0);
        assert!(data[512..].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn chain_and_sector_introspection() {
        let mut volume = nested_image().volume();
        let chain: Vec<u32> = volume.cluster_chain(5).map(|c| c.unwrap()).collect();
        assert_eq!(chain, vec![5, 6]);
        assert_eq!(volume.cluster_to_sectors(2).unwrap(), (3, 3));
        assert_eq!(volume.cluster_to_sectors(5).unwrap(), (6, 6));
        assert_eq!(volume.next_cluster(5).unwrap(), ChainLink::Next(6));
    }

    #[test]
    fn lists_directory_with_dot_entries() {
        let mut volume = nested_image().volume();
        let names: Vec<String> = volume
            .list_directory(3)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, [".", "..", "dir2"]);
    }

    #[test]
    fn bad_geometry_fails_mount() {
        let mut image = Image::new();
        image.bytes[0x0D] = 0;
        let result = Fat32Volume::from_source(DeviceSource::new(Cursor::new(image.bytes)));
        assert!(matches!(result, Err(Fat32Error::InvalidFat32 { .. })));
    }

    #[test]
    fn close_returns_source() {
        let image = nested_image();
        let len = image.bytes.len() as u64;
        let source = image.volume().close();
        assert_eq!(source.into_inner().into_inner().len() as u64, len);
    }

    #[test]
    fn split_path_drops_empty_components() {
        assert_eq!(split_path("/dir1//dir2\\file.txt"), ["dir1", "dir2", "file.txt"]);
        assert_eq!(split_path("EFI\\BOOT\\BOOTX64.EFI"), ["EFI", "BOOT", "BOOTX64.EFI"]);
        assert!(split_path("///").is_empty());
        assert!(split_path("").is_empty());
    }
}
