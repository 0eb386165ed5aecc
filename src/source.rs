//! Container access
//!
//! A `.gt3x` file is a zip archive. The converter only needs to list entry
//! sizes and read entries front to back, which is what [`EntrySource`]
//! exposes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ConvertError;
use crate::types::DeviceVariant;

pub const INFO_ENTRY: &str = "info.txt";
pub const ACTIVITY_ENTRY: &str = "activity.bin";
pub const LUX_ENTRY: &str = "lux.bin";
pub const LOG_ENTRY: &str = "log.bin";

/// Local file header signature
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Named byte streams inside a recording container
pub trait EntrySource {
    /// Entry names mapped to uncompressed sizes
    fn entry_sizes(&self) -> BTreeMap<String, u64>;

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>, ConvertError>;
}

/// Check the entries a variant needs are present
pub fn check_entries(
    sizes: &BTreeMap<String, u64>,
    variant: DeviceVariant,
) -> Result<(), ConvertError> {
    if !sizes.contains_key(INFO_ENTRY) {
        return Err(ConvertError::MissingEntry(INFO_ENTRY.to_string()));
    }
    if let Some(entry) = variant.data_entry() {
        if !sizes.contains_key(entry) {
            return Err(ConvertError::MissingEntry(entry.to_string()));
        }
    }
    if variant == DeviceVariant::Legacy && !sizes.contains_key(LUX_ENTRY) {
        log::warn!("{LUX_ENTRY} not found; continuing without it");
    }
    Ok(())
}

/// Zip-backed `.gt3x` file
pub struct Gt3xArchive {
    archive: ZipArchive<BufReader<File>>,
    sizes: BTreeMap<String, u64>,
}

impl Gt3xArchive {
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_err() || magic != ZIP_MAGIC {
            return Err(ConvertError::NotAContainer);
        }
        file.seek(SeekFrom::Start(0))?;

        let mut archive = match ZipArchive::new(BufReader::new(file)) {
            Ok(archive) => archive,
            Err(ZipError::InvalidArchive(_)) => return Err(ConvertError::NotAContainer),
            Err(e) => return Err(e.into()),
        };
        let mut sizes = BTreeMap::new();
        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            sizes.insert(entry.name().to_string(), entry.size());
        }
        log::debug!("{}: {} entries", path.display(), sizes.len());
        Ok(Self { archive, sizes })
    }
}

impl EntrySource for Gt3xArchive {
    fn entry_sizes(&self) -> BTreeMap<String, u64> {
        self.sizes.clone()
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>, ConvertError> {
        match self.archive.by_name(name) {
            Ok(entry) => Ok(Box::new(entry)),
            Err(ZipError::FileNotFound) => Err(ConvertError::MissingEntry(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Entries held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.to_string(), bytes.into());
        self
    }
}

impl EntrySource for MemorySource {
    fn entry_sizes(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|(name, bytes)| (name.clone(), bytes.len() as u64))
            .collect()
    }

    fn open_entry(&mut self, name: &str) -> Result<Box<dyn Read + '_>, ConvertError> {
        self.entries
            .get(name)
            .map(|bytes| Box::new(bytes.as_slice()) as Box<dyn Read + '_>)
            .ok_or_else(|| ConvertError::MissingEntry(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_container;

    #[test]
    fn test_archive_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.gt3x");
        write_container(
            &path,
            &[(INFO_ENTRY, b"Serial Number: X\n".to_vec()), (LOG_ENTRY, vec![1, 2, 3])],
        );

        let mut archive = Gt3xArchive::open(&path).unwrap();
        let sizes = archive.entry_sizes();
        assert_eq!(sizes.get(LOG_ENTRY), Some(&3));
        assert_eq!(sizes.get(INFO_ENTRY), Some(&17));

        let mut bytes = Vec::new();
        archive.open_entry(LOG_ENTRY).unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        assert!(matches!(
            archive.open_entry(ACTIVITY_ENTRY),
            Err(ConvertError::MissingEntry(_))
        ));
    }

    #[test]
    fn test_not_a_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.gt3x");
        std::fs::write(&path, b"Serial Number: NEO\n").unwrap();
        assert!(matches!(
            Gt3xArchive::open(&path),
            Err(ConvertError::NotAContainer)
        ));

        std::fs::write(&path, b"PK").unwrap();
        assert!(matches!(
            Gt3xArchive::open(&path),
            Err(ConvertError::NotAContainer)
        ));
    }

    #[test]
    fn test_check_entries() {
        let mut sizes = BTreeMap::new();
        sizes.insert(INFO_ENTRY.to_string(), 10);
        assert!(matches!(
            check_entries(&sizes, DeviceVariant::Framed),
            Err(ConvertError::MissingEntry(name)) if name == LOG_ENTRY
        ));

        sizes.insert(ACTIVITY_ENTRY.to_string(), 90);
        // lux.bin is optional
        assert!(check_entries(&sizes, DeviceVariant::Legacy).is_ok());

        sizes.remove(INFO_ENTRY);
        assert!(matches!(
            check_entries(&sizes, DeviceVariant::Legacy),
            Err(ConvertError::MissingEntry(name)) if name == INFO_ENTRY
        ));
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemorySource::new().with_entry(INFO_ENTRY, "abc");
        assert_eq!(source.entry_sizes().get(INFO_ENTRY), Some(&3));
        let mut text = String::new();
        source
            .open_entry(INFO_ENTRY)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "abc");
        assert!(source.open_entry(LOG_ENTRY).is_err());
    }
}
