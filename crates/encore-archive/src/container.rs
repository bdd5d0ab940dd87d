//! Flat song pack container
//!
//! A song pack is a single flat archive: a fixed header followed by named
//! entries until end of file. Exactly one entry is the canonical metadata
//! document ([`METADATA_ENTRY`]); track payloads are referenced from the
//! metadata track list by entry name; every other entry is opaque and must
//! round-trip byte-for-byte.
//!
//! On-disk layout (all integers little-endian):
//!
//! ```text
//! magic "SPK1" | u16 version | entry*
//! entry: u16 name_len | name (UTF-8) | u64 data_len | data
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::ArchiveError;

/// Container magic bytes
pub const MAGIC: [u8; 4] = *b"SPK1";

/// Current container format version
pub const FORMAT_VERSION: u16 = 1;

/// Canonical name of the metadata document entry
pub const METADATA_ENTRY: &str = "song.json";

/// Maximum entry name length (sanity bound against corrupted headers)
const MAX_NAME_LEN: usize = 4096;

/// A single named entry read from a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name (UTF-8, unique within a container)
    pub name: String,
    /// Entry payload, verbatim
    pub data: Vec<u8>,
}

/// Streaming container reader
pub struct ContainerReader<R: Read> {
    reader: R,
    version: u16,
}

impl ContainerReader<BufReader<File>> {
    /// Open a container file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> ContainerReader<R> {
    /// Wrap a reader, validating the container header
    pub fn new(mut reader: R) -> Result<Self, ArchiveError> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| ArchiveError::Corrupted("missing container header".into()))?;
        if magic != MAGIC {
            return Err(ArchiveError::Corrupted("not a song pack (bad magic)".into()));
        }

        let mut version_bytes = [0u8; 2];
        reader
            .read_exact(&mut version_bytes)
            .map_err(|_| ArchiveError::Corrupted("missing container version".into()))?;
        let version = u16::from_le_bytes(version_bytes);
        if version == 0 || version > FORMAT_VERSION {
            return Err(ArchiveError::Corrupted(format!(
                "unsupported container version {}",
                version
            )));
        }

        Ok(Self { reader, version })
    }

    /// Container format version read from the header
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Read the next entry, or `None` at a clean end of file
    ///
    /// End of file is only legal on an entry boundary; a partial header or
    /// short payload is reported as [`ArchiveError::Corrupted`].
    pub fn next_entry(&mut self) -> Result<Option<Entry>, ArchiveError> {
        let mut len_bytes = [0u8; 2];
        let first = self.reader.read(&mut len_bytes)?;
        if first == 0 {
            return Ok(None); // clean EOF on entry boundary
        }
        if first < 2 {
            self.reader
                .read_exact(&mut len_bytes[first..])
                .map_err(|_| ArchiveError::Corrupted("truncated entry header".into()))?;
        }
        let name_len = u16::from_le_bytes(len_bytes) as usize;
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(ArchiveError::Corrupted(format!(
                "invalid entry name length {}",
                name_len
            )));
        }

        let mut name_bytes = vec![0u8; name_len];
        self.reader
            .read_exact(&mut name_bytes)
            .map_err(|_| ArchiveError::Corrupted("truncated entry name".into()))?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| ArchiveError::Corrupted("entry name is not UTF-8".into()))?;

        let mut data_len_bytes = [0u8; 8];
        self.reader
            .read_exact(&mut data_len_bytes)
            .map_err(|_| ArchiveError::Corrupted("truncated entry header".into()))?;
        let data_len = u64::from_le_bytes(data_len_bytes);

        // The declared length comes straight off disk and cannot be
        // trusted: read through a take() so a lying header runs out of
        // stream instead of committing the allocation up front.
        let mut data = Vec::new();
        let read = (&mut self.reader)
            .take(data_len)
            .read_to_end(&mut data)?;
        if (read as u64) < data_len {
            return Err(ArchiveError::Corrupted(format!(
                "truncated payload for '{}'",
                name
            )));
        }

        Ok(Some(Entry { name, data }))
    }

    /// Read all remaining entries in order
    pub fn read_all(&mut self) -> Result<Vec<Entry>, ArchiveError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Streaming container writer
pub struct ContainerWriter<W: Write> {
    writer: W,
}

impl ContainerWriter<BufWriter<File>> {
    /// Create a container file, truncating any existing one
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> ContainerWriter<W> {
    /// Wrap a writer and emit the container header
    pub fn new(mut writer: W) -> Result<Self, ArchiveError> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        Ok(Self { writer })
    }

    /// Append one named entry
    pub fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<(), ArchiveError> {
        let name_bytes = name.as_bytes();
        assert!(
            !name_bytes.is_empty() && name_bytes.len() <= MAX_NAME_LEN,
            "entry name length out of range"
        );
        self.writer.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
        self.writer.write_all(name_bytes)?;
        self.writer.write_all(&(data.len() as u64).to_le_bytes())?;
        self.writer.write_all(data)?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> Result<W, ArchiveError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(entries: &[(&str, &[u8])]) -> Vec<Entry> {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();
        for (name, data) in entries {
            writer.write_entry(name, data).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let mut reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        reader.read_all().unwrap()
    }

    #[test]
    fn test_empty_container() {
        assert!(roundtrip(&[]).is_empty());
    }

    #[test]
    fn test_entry_roundtrip() {
        let read = roundtrip(&[
            ("song.json", b"{}".as_slice()),
            ("vocals.ogg", &[0u8, 1, 2, 255]),
            ("analysis/pitch.bin", &[]),
        ]);

        assert_eq!(read.len(), 3);
        assert_eq!(read[0].name, "song.json");
        assert_eq!(read[1].data, vec![0u8, 1, 2, 255]);
        assert_eq!(read[2].name, "analysis/pitch.bin");
        assert!(read[2].data.is_empty());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let result = ContainerReader::new(Cursor::new(b"RIFF\x01\x00".to_vec()));
        assert!(matches!(result, Err(ArchiveError::Corrupted(_))));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&99u16.to_le_bytes());
        let result = ContainerReader::new(Cursor::new(bytes));
        assert!(matches!(result, Err(ArchiveError::Corrupted(_))));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();
        writer.write_entry("vocals.ogg", &[1, 2, 3, 4]).unwrap();
        let mut bytes = writer.finish().unwrap();
        bytes.truncate(bytes.len() - 2);

        let mut reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let err = reader.next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupted(_)));
    }

    #[test]
    fn test_huge_declared_payload_rejected() {
        // A header claiming a u64::MAX payload must fail as corrupt, not
        // abort trying to allocate it.
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&10u16.to_le_bytes());
        bytes.extend_from_slice(b"vocals.ogg");
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);

        let mut reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let err = reader.next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupted(_)));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.push(3); // half of a name_len field

        let mut reader = ContainerReader::new(Cursor::new(bytes)).unwrap();
        let err = reader.next_entry().unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupted(_)));
    }
}
