//! Compressed tree snapshots
//!
//! The whole tree is written as JSON, LZ4-compressed, behind a small header:
//!
//! ```text
//! magic "MHTREE01" (8) | crc32 of body (4) | body (lz4, size-prepended)
//! ```
//!
//! Snapshots are written to a temporary file and renamed into place so a
//! crash mid-write leaves the previous snapshot intact.

use crate::storage::error::{StorageError, StorageResult};
use serde_json::Value;
use std::path::Path;

const MAGIC: &[u8; 8] = b"MHTREE01";
const HEADER_LEN: usize = 12;

/// Encode a tree root into snapshot bytes
pub fn encode_snapshot(root: &Value) -> StorageResult<Vec<u8>> {
    let json = serde_json::to_vec(root)?;
    let body = lz4_flex::compress_prepend_size(&json);
    let crc = crc32fast::hash(&body);

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode snapshot bytes back into a tree root
pub fn decode_snapshot(data: &[u8]) -> StorageResult<Value> {
    if data.len() < HEADER_LEN || &data[..8] != MAGIC {
        return Err(StorageError::Corruption(
            "snapshot header missing or invalid".to_string(),
        ));
    }

    let mut crc_buf = [0u8; 4];
    crc_buf.copy_from_slice(&data[8..HEADER_LEN]);
    let stored_crc = u32::from_le_bytes(crc_buf);

    let body = &data[HEADER_LEN..];
    let computed_crc = crc32fast::hash(body);
    if stored_crc != computed_crc {
        return Err(StorageError::Corruption(format!(
            "snapshot CRC mismatch: stored={}, computed={}",
            stored_crc, computed_crc
        )));
    }

    let json = lz4_flex::decompress_size_prepended(body)
        .map_err(|e| StorageError::Compression(e.to_string()))?;

    Ok(serde_json::from_slice(&json)?)
}

/// Atomically write a snapshot file
pub fn write_snapshot(path: &Path, root: &Value) -> StorageResult<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let bytes = encode_snapshot(root)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(bytes.len())
}

/// Read a snapshot file, `None` if none has been written yet
pub fn read_snapshot(path: &Path) -> StorageResult<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    decode_snapshot(&data).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta").join("tree.snap");
        let root = json!({"k": {"meals": {"1": {"title": "Tacos", "frequencyDays": 7}}}});

        write_snapshot(&path, &root).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), Some(root));
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempdir().unwrap();
        assert!(read_snapshot(&dir.path().join("none.snap")).unwrap().is_none());
    }

    #[test]
    fn test_corruption_detected() {
        let mut bytes = encode_snapshot(&json!({"k": 1})).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(StorageError::Corruption(_))
        ));

        assert!(decode_snapshot(b"short").is_err());
    }

    #[test]
    fn test_repetitive_tree_compresses() {
        let meals: serde_json::Map<String, Value> = (0..200)
            .map(|i| {
                (
                    format!("meal-{}", i),
                    json!({"title": "Spaghetti", "frequencyDays": 7, "ingredients": [{"name": "pasta"}]}),
                )
            })
            .collect();
        let root = json!({"k": {"meals": meals}});

        let raw = serde_json::to_vec(&root).unwrap().len();
        let encoded = encode_snapshot(&root).unwrap().len();
        assert!(encoded < raw);
    }
}
