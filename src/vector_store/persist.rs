//! On-disk format of the vector store.
//!
//! `events.index` holds a small header followed by the normalized rows as little-endian
//! `f32`. `metadata.msgpack` holds the chunks in the same order. Both files carry the
//! id of the build that wrote them and are only loaded as a pair when the ids agree.
//! Each is written to a temporary file in the target directory and renamed into place.

use super::flat::FlatIndex;
use super::VectorStore;
use crate::chunking::Chunk;
use crate::error::{PulsError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

pub const INDEX_FILE: &str = "events.index";
pub const METADATA_FILE: &str = "metadata.msgpack";

const MAGIC: &[u8; 8] = b"PULSIDX\0";
const FORMAT_VERSION: u32 = 2;

#[derive(Serialize)]
struct MetadataOut<'a> {
    build_id: Uuid,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct MetadataIn {
    build_id: Uuid,
    chunks: Vec<Chunk>,
}

/// Header fields of the index file.
struct IndexHeader {
    build_id: Uuid,
    model: String,
}

/// Serialize embedding rows to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding rows from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn encode_index(build_id: Uuid, model: &str, index: &FlatIndex) -> Vec<u8> {
    let rows = embedding_to_bytes(index.raw());
    let mut out = Vec::with_capacity(MAGIC.len() + 40 + model.len() + rows.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(build_id.as_bytes());
    out.extend_from_slice(&(model.len() as u32).to_le_bytes());
    out.extend_from_slice(model.as_bytes());
    out.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    out.extend_from_slice(&rows);
    out
}

/// Cursor over the index file that reports short reads as corruption.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(PulsError::IndexMismatch("truncated index file".to_string()));
        }
        let (head, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        Ok(head)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }
}

fn decode_index(bytes: &[u8]) -> Result<(IndexHeader, FlatIndex)> {
    let mut reader = Reader { bytes };

    if reader.take(MAGIC.len())? != MAGIC {
        return Err(PulsError::IndexMismatch("not a Puls index file".to_string()));
    }
    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(PulsError::IndexMismatch(format!(
            "unsupported index format version {}",
            version
        )));
    }

    let build_id = Uuid::from_slice(reader.take(16)?)
        .map_err(|_| PulsError::IndexMismatch("bad build id".to_string()))?;
    let model_len = reader.u32()? as usize;
    let model = String::from_utf8(reader.take(model_len)?.to_vec())
        .map_err(|_| PulsError::IndexMismatch("model id is not UTF-8".to_string()))?;
    let dimension = reader.u32()? as usize;
    let count = reader.u64()? as usize;

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| PulsError::IndexMismatch("index header overflows".to_string()))?;
    let rows = reader.take(expected)?;
    if !reader.bytes.is_empty() {
        return Err(PulsError::IndexMismatch(format!(
            "{} trailing bytes after index rows",
            reader.bytes.len()
        )));
    }

    let index = FlatIndex::from_raw(dimension, bytes_to_embedding(rows))?;
    Ok((IndexHeader { build_id, model }, index))
}

fn write_temp(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

impl VectorStore {
    /// Write the index and metadata files into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let build_id = Uuid::new_v4();
        let index_bytes = encode_index(build_id, &self.model, &self.index);
        let metadata_bytes = rmp_serde::to_vec_named(&MetadataOut {
            build_id,
            chunks: &self.chunks,
        })?;

        // Both temporaries are complete before either target is replaced.
        let index_tmp = write_temp(dir, &index_bytes)?;
        let metadata_tmp = write_temp(dir, &metadata_bytes)?;
        index_tmp
            .persist(dir.join(INDEX_FILE))
            .map_err(|e| PulsError::Io(e.error))?;
        metadata_tmp
            .persist(dir.join(METADATA_FILE))
            .map_err(|e| PulsError::Io(e.error))?;

        info!(
            "Saved vector store ({} vectors, dimension {}) to {:?}",
            self.len(),
            self.dimension(),
            dir
        );
        Ok(())
    }

    /// Load a store saved by [`save`](Self::save). Any inconsistency between the two
    /// files is reported as [`PulsError::IndexMismatch`].
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE);
        let metadata_path = dir.join(METADATA_FILE);
        if !index_path.exists() || !metadata_path.exists() {
            return Err(PulsError::VectorStore(format!(
                "No vector store found in {:?}. Run 'puls index' first.",
                dir
            )));
        }

        let (header, index) = decode_index(&std::fs::read(&index_path)?)?;
        let metadata: MetadataIn = rmp_serde::from_slice(&std::fs::read(&metadata_path)?)
            .map_err(|e| PulsError::IndexMismatch(format!("unreadable metadata: {}", e)))?;

        if metadata.build_id != header.build_id {
            return Err(PulsError::IndexMismatch(format!(
                "index is from build {} but metadata is from build {}",
                header.build_id, metadata.build_id
            )));
        }
        let chunks = metadata.chunks;
        if chunks.len() != index.len() {
            return Err(PulsError::IndexMismatch(format!(
                "index has {} vectors but metadata has {} chunks",
                index.len(),
                chunks.len()
            )));
        }

        info!("Loaded vector store with {} vectors from {:?}", index.len(), dir);
        Ok(Self {
            model: header.model,
            index,
            chunks,
        })
    }

    /// Whether both files of a store are present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).exists() && dir.join(METADATA_FILE).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::tests::{sample_chunks, sample_store};

    #[test]
    fn test_save_load_keeps_lockstep() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store();
        store.save(dir.path()).unwrap();

        let loaded = VectorStore::load(dir.path()).unwrap();
        assert_eq!(loaded.model(), "test-embed");
        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.chunks(), store.chunks());

        let before = store.search(&[0.0, 1.0, 0.0], 3).unwrap();
        let after = loaded.search(&[0.0, 1.0, 0.0], 3).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_save_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        sample_store().save(dir.path()).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![INDEX_FILE, METADATA_FILE]);
    }

    #[test]
    fn test_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!VectorStore::exists(dir.path()));
        assert!(matches!(VectorStore::load(dir.path()), Err(PulsError::VectorStore(_))));
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        sample_store().save(dir.path()).unwrap();
        let path = dir.path().join(INDEX_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(VectorStore::load(dir.path()), Err(PulsError::IndexMismatch(_))));
    }

    #[test]
    fn test_truncated_index() {
        let dir = tempfile::tempdir().unwrap();
        sample_store().save(dir.path()).unwrap();
        let path = dir.path().join(INDEX_FILE);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        assert!(matches!(VectorStore::load(dir.path()), Err(PulsError::IndexMismatch(_))));
    }

    #[test]
    fn test_metadata_from_other_build() {
        let dir = tempfile::tempdir().unwrap();
        sample_store().save(dir.path()).unwrap();

        let fewer = &sample_chunks()[..2];
        std::fs::write(
            dir.path().join(METADATA_FILE),
            rmp_serde::to_vec_named(fewer).unwrap(),
        )
        .unwrap();

        assert!(matches!(VectorStore::load(dir.path()), Err(PulsError::IndexMismatch(_))));
    }

    #[test]
    fn test_metadata_from_other_build_with_same_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store();
        store.save(dir.path()).unwrap();
        let stale_metadata = std::fs::read(dir.path().join(METADATA_FILE)).unwrap();

        store.save(dir.path()).unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), stale_metadata).unwrap();

        let err = VectorStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, PulsError::IndexMismatch(ref msg) if msg.contains("build")));
    }

    #[test]
    fn test_garbage_metadata() {
        let dir = tempfile::tempdir().unwrap();
        sample_store().save(dir.path()).unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), b"not msgpack at all").unwrap();

        assert!(matches!(VectorStore::load(dir.path()), Err(PulsError::IndexMismatch(_))));
    }
}
