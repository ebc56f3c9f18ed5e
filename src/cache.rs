//! C3 — content-addressed IR cache (spec §4.2, §6 "Persisted state
//! layout").
//!
//! Two backends behind one facade, matching the teacher's
//! `storage/` split between an in-memory tier and a disk-backed tier: a
//! bounded in-memory `MemoryCache` (DashMap + insertion-order eviction)
//! and a `DiskCache` using the `"IRC1"` framed file format named in spec
//! §6. A cache miss never fails the build; a put failure is logged and
//! ignored (spec §4.2 "Operations").

use crate::config::{BuildConfig, CacheBackend};
use crate::error::{CacheError, CacheResult};
use crate::irdoc::IRDocument;
use dashmap::DashMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DISK_MAGIC: &[u8; 4] = b"IRC1";

/// `H(content_hash ‖ language ‖ schema_version ‖ config_hash)`, truncated
/// to 128 bits hex (spec §6 "IR cache key").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn compute(content_hash: &str, language: &str, schema_version: &str, config_hash: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content_hash.as_bytes());
        hasher.update(b"\0");
        hasher.update(language.as_bytes());
        hasher.update(b"\0");
        hasher.update(schema_version.as_bytes());
        hasher.update(b"\0");
        hasher.update(config_hash.as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(32);
        for byte in &digest[..16] {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }
}

/// In-memory tier: DashMap for concurrent reads from worker threads, a
/// mutex-guarded insertion-order queue for bounded eviction.
pub struct MemoryCache {
    entries: DashMap<String, Arc<IRDocument>>,
    order: Mutex<VecDeque<String>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<IRDocument>> {
        self.entries.get(&key.0).map(|v| v.clone())
    }

    pub fn put(&self, key: &CacheKey, doc: Arc<IRDocument>) {
        if self.entries.insert(key.0.clone(), doc).is_none() {
            let mut order = self.order.lock();
            order.push_back(key.0.clone());
            while order.len() > self.max_entries {
                if let Some(oldest) = order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.order.lock().clear();
    }
}

/// Disk tier: one file per cache key under `<cache_root>/<key[:2]>/<key>.bin`.
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        let shard = &key.0[..2.min(key.0.len())];
        self.root.join(shard).join(format!("{}.bin", key.0))
    }

    pub fn get(&self, key: &CacheKey) -> CacheResult<Option<IRDocument>> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };
        decode_entry(&bytes, &path).map(Some)
    }

    /// Write with atomic-rename discipline: write to a sibling temp file,
    /// then rename into place, so no cached entry is ever half-written
    /// (spec §4.9 "No cached entry is half-written").
    pub fn put(&self, key: &CacheKey, content_hash: &str, config_hash: &str, doc: &IRDocument) -> CacheResult<()> {
        let path = self.path_for(key);
        let dir = path.parent().expect("path has a parent shard directory");
        std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let encoded = encode_entry(content_hash, config_hash, doc)?;
        let tmp_path = path.with_extension("bin.tmp");
        {
            let mut tmp = std::fs::File::create(&tmp_path).map_err(|e| CacheError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            tmp.write_all(&encoded).map_err(|e| CacheError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
        }
        std::fs::rename(&tmp_path, &path).map_err(|e| CacheError::Io { path, source: e })?;
        Ok(())
    }

    pub fn clear(&self) -> std::io::Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

fn encode_entry(content_hash: &str, config_hash: &str, doc: &IRDocument) -> CacheResult<Vec<u8>> {
    let json = serde_json::to_vec(doc)?;
    let mut buf = Vec::with_capacity(json.len() + 64);
    buf.extend_from_slice(DISK_MAGIC);

    let schema = doc.schema_version.as_bytes();
    buf.extend_from_slice(&(schema.len() as u32).to_le_bytes());
    buf.extend_from_slice(schema);

    buf.extend_from_slice(&hash_bytes32(content_hash));
    buf.extend_from_slice(&hash_bytes32(config_hash));

    buf.extend_from_slice(&(json.len() as u64).to_le_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

fn decode_entry(bytes: &[u8], path: &Path) -> CacheResult<IRDocument> {
    let corrupted = |reason: &str| CacheError::Corrupted {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if bytes.len() < 4 || &bytes[..4] != DISK_MAGIC {
        return Err(corrupted("missing IRC1 magic"));
    }
    let mut pos = 4;
    let schema_len = read_u32(bytes, &mut pos).ok_or_else(|| corrupted("truncated schema length"))?;
    pos += schema_len as usize;
    if bytes.len() < pos + 64 {
        return Err(corrupted("truncated hash block"));
    }
    pos += 64; // content_hash(32) + config_hash(32), not re-verified here
    let json_len = read_u64(bytes, &mut pos).ok_or_else(|| corrupted("truncated json length"))?;
    let end = pos + json_len as usize;
    if bytes.len() < end {
        return Err(corrupted("truncated json payload"));
    }
    let doc: IRDocument = serde_json::from_slice(&bytes[pos..end])?;
    Ok(doc)
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Option<u32> {
    let slice = bytes.get(*pos..*pos + 4)?;
    *pos += 4;
    Some(u32::from_le_bytes(slice.try_into().ok()?))
}

fn read_u64(bytes: &[u8], pos: &mut usize) -> Option<u64> {
    let slice = bytes.get(*pos..*pos + 8)?;
    *pos += 8;
    Some(u64::from_le_bytes(slice.try_into().ok()?))
}

fn hash_bytes32(hex_or_raw: &str) -> [u8; 32] {
    let digest = Sha256::digest(hex_or_raw.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Facade selecting memory or disk backing per `BuildConfig::cache`
/// (spec §4.2 "IR Cache (C3)").
pub struct IrCache {
    memory: MemoryCache,
    disk: Option<DiskCache>,
}

impl IrCache {
    pub fn from_config(config: &BuildConfig) -> Self {
        let memory = MemoryCache::new(config.cache.memory_max_entries);
        let disk = match config.cache.backend {
            CacheBackend::Disk => Some(DiskCache::new(&config.cache.disk_path)),
            CacheBackend::Memory => None,
        };
        Self { memory, disk }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<IRDocument>> {
        if let Some(doc) = self.memory.get(key) {
            return Some(doc);
        }
        let disk = self.disk.as_ref()?;
        match disk.get(key) {
            Ok(Some(doc)) => {
                let doc = Arc::new(doc);
                self.memory.put(key, doc.clone());
                Some(doc)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "disk cache read failed, treating as miss");
                None
            }
        }
    }

    pub fn put(&self, key: &CacheKey, content_hash: &str, config_hash: &str, doc: IRDocument) {
        let doc = Arc::new(doc);
        self.memory.put(key, doc.clone());
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.put(key, content_hash, config_hash, &doc) {
                tracing::warn!(error = %e, "disk cache write failed, ignoring");
            }
        }
    }

    pub fn clear(&self) {
        self.memory.clear();
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.clear() {
                tracing::warn!(error = %e, "disk cache clear failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irdoc::IRDocumentMeta;

    fn sample_doc() -> IRDocument {
        IRDocument {
            repo_id: "repo".into(),
            snapshot_id: "snap".into(),
            file_path: "a.py".into(),
            language: "python".into(),
            schema_version: "4.1.0".into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            occurrences: Vec::new(),
            signatures: Vec::new(),
            cfg_graphs: Vec::new(),
            bfg_graphs: Vec::new(),
            meta: IRDocumentMeta {
                content_hash: "abc".into(),
                schema_version: "4.1.0".into(),
            },
            parse_errors: Vec::new(),
            failures: Vec::new(),
            dfg_snapshots: Vec::new(),
        }
    }

    #[test]
    fn cache_key_is_deterministic() {
        let a = CacheKey::compute("c1", "python", "4.1.0", "cfg1");
        let b = CacheKey::compute("c1", "python", "4.1.0", "cfg1");
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_changes_with_content_hash() {
        let a = CacheKey::compute("c1", "python", "4.1.0", "cfg1");
        let b = CacheKey::compute("c2", "python", "4.1.0", "cfg1");
        assert_ne!(a, b);
    }

    #[test]
    fn memory_cache_evicts_oldest() {
        let cache = MemoryCache::new(2);
        let k1 = CacheKey("k1".into());
        let k2 = CacheKey("k2".into());
        let k3 = CacheKey("k3".into());
        cache.put(&k1, Arc::new(sample_doc()));
        cache.put(&k2, Arc::new(sample_doc()));
        cache.put(&k3, Arc::new(sample_doc()));
        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn disk_cache_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskCache::new(dir.path());
        let key = CacheKey::compute("c1", "python", "4.1.0", "cfg1");
        let doc = sample_doc();
        disk.put(&key, "c1", "cfg1", &doc).unwrap();
        let loaded = disk.get(&key).unwrap().expect("entry present");
        assert_eq!(loaded.file_path, doc.file_path);
    }

    #[test]
    fn disk_cache_miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskCache::new(dir.path());
        let key = CacheKey::compute("nope", "python", "4.1.0", "cfg1");
        assert!(disk.get(&key).unwrap().is_none());
    }
}
