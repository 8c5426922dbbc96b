//! Write-Ahead Log (WAL) for durability guarantees
//!
//! Every tree write is appended here before it is applied in memory. On
//! open, entries newer than the last snapshot are replayed in order.
//!
//! Format per entry:
//! - length: u32 (4 bytes)
//! - data: [u8; length] (bincode-serialized `WalEntry`)
//! - crc: u32 (4 bytes, CRC32 of length + data)

use crate::storage::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Maximum accepted entry size (a whole household replaced in one write)
const MAX_ENTRY_LEN: usize = 16 * 1024 * 1024;

/// Sync strategy for WAL writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalSyncMode {
    /// Fsync after every write (safest, slowest)
    EveryWrite,
    /// Fsync in batches (balanced)
    #[default]
    Batched,
    /// No fsync, rely on OS (fastest, risk of loss)
    None,
}

/// One logged write: the path and its JSON payload (`None` removes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub path: String,
    pub payload: Option<String>,
    pub timestamp_ms: i64,
}

impl WalEntry {
    pub fn new(path: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            path: path.into(),
            payload,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Write-Ahead Log for durability
pub struct WriteAheadLog {
    writer: BufWriter<File>,
    path: PathBuf,
    entry_count: u64,
    bytes_since_sync: usize,
    sync_mode: WalSyncMode,
    sync_threshold: usize,
}

impl WriteAheadLog {
    /// Open or create a WAL file
    pub fn open(path: impl AsRef<Path>, sync_mode: WalSyncMode) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let entry_count = Self::count_entries(&path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            entry_count,
            bytes_since_sync: 0,
            sync_mode,
            sync_threshold: 64 * 1024,
        })
    }

    fn count_entries(path: &Path) -> StorageResult<u64> {
        if !path.exists() {
            return Ok(0);
        }

        let mut reader = BufReader::new(File::open(path)?);
        let mut count = 0u64;

        loop {
            match Self::read_entry_from(&mut reader) {
                Ok(Some(_)) => count += 1,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("WAL corruption at entry {}: {}", count, e);
                    break;
                }
            }
        }

        Ok(count)
    }

    /// Append one write to the WAL
    pub fn append(&mut self, entry: &WalEntry) -> StorageResult<()> {
        let data = bincode::serialize(entry)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&(data.len() as u32).to_le_bytes());
        hasher.update(&data);
        let crc = hasher.finalize();

        self.writer.write_all(&(data.len() as u32).to_le_bytes())?;
        self.writer.write_all(&data)?;
        self.writer.write_all(&crc.to_le_bytes())?;

        self.entry_count += 1;
        self.bytes_since_sync += 8 + data.len();

        self.maybe_sync()
    }

    fn maybe_sync(&mut self) -> StorageResult<()> {
        match self.sync_mode {
            WalSyncMode::EveryWrite => self.sync()?,
            WalSyncMode::Batched => {
                if self.bytes_since_sync >= self.sync_threshold {
                    self.sync()?;
                } else {
                    self.writer.flush()?;
                }
            }
            WalSyncMode::None => self.writer.flush()?,
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> StorageResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.bytes_since_sync = 0;
        Ok(())
    }

    /// Read all intact entries for recovery
    pub fn recover(&self) -> StorageResult<Vec<WalEntry>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();

        loop {
            match Self::read_entry_from(&mut reader) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("WAL recovery stopped at entry {}: {}", entries.len(), e);
                    break;
                }
            }
        }

        Ok(entries)
    }

    fn read_entry_from<R: Read>(reader: &mut R) -> StorageResult<Option<WalEntry>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > MAX_ENTRY_LEN {
            return Err(StorageError::WalError(format!(
                "Entry length too large: {}",
                len
            )));
        }

        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_buf);
        hasher.update(&data);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(StorageError::Corruption(format!(
                "CRC mismatch: stored={}, computed={}",
                stored_crc, computed_crc
            )));
        }

        let entry: WalEntry = bincode::deserialize(&data)?;
        Ok(Some(entry))
    }

    /// Truncate the WAL (after a successful snapshot)
    pub fn truncate(&mut self) -> StorageResult<()> {
        self.sync()?;

        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;

        self.writer = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        );

        self.entry_count = 0;
        self.bytes_since_sync = 0;

        Ok(())
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn has_pending(&self) -> bool {
        self.entry_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};
    use tempfile::tempdir;

    fn entry(path: &str, payload: Option<&str>) -> WalEntry {
        WalEntry::new(path, payload.map(str::to_string))
    }

    #[test]
    fn test_wal_basic_operations() {
        let dir = tempdir().unwrap();
        let wal_path = dir.path().join("test.wal");

        {
            let mut wal = WriteAheadLog::open(&wal_path, WalSyncMode::EveryWrite).unwrap();
            wal.append(&entry("k/meals/1", Some(r#"{"title":"Tacos"}"#)))
                .unwrap();
            wal.append(&entry("k/meals/1", None)).unwrap();
            assert_eq!(wal.entry_count(), 2);
        }

        {
            let wal = WriteAheadLog::open(&wal_path, WalSyncMode::EveryWrite).unwrap();
            let recovered = wal.recover().unwrap();

            assert_eq!(recovered.len(), 2);
            assert_eq!(recovered[0].path, "k/meals/1");
            assert_eq!(recovered[0].payload.as_deref(), Some(r#"{"title":"Tacos"}"#));
            assert!(recovered[1].payload.is_none());
        }
    }

    #[test]
    fn test_wal_truncate() {
        let dir = tempdir().unwrap();
        let wal_path = dir.path().join("test.wal");

        let mut wal = WriteAheadLog::open(&wal_path, WalSyncMode::EveryWrite).unwrap();
        for i in 0..10 {
            wal.append(&entry(&format!("k/meals/{}", i), Some("{}"))).unwrap();
        }
        assert_eq!(wal.entry_count(), 10);

        wal.truncate().unwrap();
        assert_eq!(wal.entry_count(), 0);
        assert!(wal.recover().unwrap().is_empty());
    }

    #[test]
    fn test_wal_crc_corruption_detection() {
        let dir = tempdir().unwrap();
        let wal_path = dir.path().join("test.wal");

        {
            let mut wal = WriteAheadLog::open(&wal_path, WalSyncMode::EveryWrite).unwrap();
            wal.append(&entry("k/meals/1", Some(r#"{"title":"Tacos"}"#)))
                .unwrap();
        }

        {
            let mut file = OpenOptions::new().write(true).open(&wal_path).unwrap();
            file.seek(SeekFrom::Start(10)).unwrap();
            file.write_all(&[0xFF, 0xFF]).unwrap();
        }

        let wal = WriteAheadLog::open(&wal_path, WalSyncMode::EveryWrite).unwrap();
        assert!(wal.recover().unwrap().is_empty());
    }

    #[test]
    fn test_wal_persistence_across_opens() {
        let dir = tempdir().unwrap();
        let wal_path = dir.path().join("test.wal");

        for round in 0..2 {
            let mut wal = WriteAheadLog::open(&wal_path, WalSyncMode::Batched).unwrap();
            for i in 0..5 {
                wal.append(&entry(&format!("k/{}/{}", round, i), Some("1")))
                    .unwrap();
            }
            wal.sync().unwrap();
        }

        let wal = WriteAheadLog::open(&wal_path, WalSyncMode::Batched).unwrap();
        assert_eq!(wal.entry_count(), 10);
        assert_eq!(wal.recover().unwrap().len(), 10);
    }
}
