//! Layered build configuration.
//!
//! Provides defaults → TOML file → environment variable overrides, the way
//! the teacher's `src/config.rs` layers `Settings` with figment. Variables
//! are prefixed `CODEIR_` with `__` separating nested levels, e.g.
//! `CODEIR_CACHE__BACKEND=disk`.
//!
//! This is a closed struct (spec §9 "Dynamic named configuration"): unknown
//! TOML keys are rejected at `load` time by `#[serde(deny_unknown_fields)]`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    Disk,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SemanticMode {
    Quick,
    Full,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,
}

impl Default for CacheBackend {
    fn default() -> Self {
        CacheBackend::Memory
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    #[serde(default = "default_balanced_neighbor_depth")]
    pub balanced_neighbor_depth: usize,
    #[serde(default = "default_balanced_max_neighbors")]
    pub balanced_max_neighbors: usize,
    #[serde(default = "default_deep_subset_max_files")]
    pub deep_subset_max_files: usize,
    #[serde(default = "default_deep_subset_max_percent")]
    pub deep_subset_max_percent: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ImpactConfig {
    #[serde(default = "default_impact_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_impact_max_affected")]
    pub max_affected: usize,
    #[serde(default)]
    pub include_test_files: bool,
}

/// The enumerated build configuration named in spec §6.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default)]
    pub parallel_workers: usize,
    #[serde(default = "default_min_files_for_parallel")]
    pub min_files_for_parallel: usize,
    #[serde(default = "default_per_file_timeout_s")]
    pub per_file_timeout_s: u64,
    #[serde(default = "default_true")]
    pub enable_semantic_ir: bool,
    #[serde(default = "default_semantic_mode")]
    pub semantic_mode: SemanticMode,
    #[serde(default = "default_true")]
    pub enable_cross_file: bool,
    #[serde(default = "default_true")]
    pub enable_retrieval_index: bool,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_incremental_update_threshold")]
    pub incremental_update_threshold: f64,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
}

fn default_true() -> bool {
    true
}
fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}
fn default_disk_path() -> PathBuf {
    PathBuf::from(".codeir/cache")
}
fn default_memory_max_entries() -> usize {
    10_000
}
fn default_min_files_for_parallel() -> usize {
    5
}
fn default_per_file_timeout_s() -> u64 {
    30
}
fn default_semantic_mode() -> SemanticMode {
    SemanticMode::Full
}
fn default_schema_version() -> String {
    "4.1.0".to_string()
}
fn default_max_file_bytes() -> u64 {
    10_000_000
}
fn default_incremental_update_threshold() -> f64 {
    0.3
}
fn default_balanced_neighbor_depth() -> usize {
    1
}
fn default_balanced_max_neighbors() -> usize {
    50
}
fn default_deep_subset_max_files() -> usize {
    5_000
}
fn default_deep_subset_max_percent() -> f64 {
    0.3
}
fn default_impact_max_depth() -> usize {
    5
}
fn default_impact_max_affected() -> usize {
    1_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            disk_path: default_disk_path(),
            memory_max_entries: default_memory_max_entries(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 0,
            min_files_for_parallel: default_min_files_for_parallel(),
            per_file_timeout_s: default_per_file_timeout_s(),
            enable_semantic_ir: true,
            semantic_mode: default_semantic_mode(),
            enable_cross_file: true,
            enable_retrieval_index: true,
            schema_version: default_schema_version(),
            max_file_bytes: default_max_file_bytes(),
            cache: CacheConfig::default(),
            incremental_update_threshold: default_incremental_update_threshold(),
            scope: ScopeConfig::default(),
            impact: ImpactConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Resolved worker count: `parallel_workers == 0` means "auto"
    /// (`num_cpus::get()`), per spec §6.
    pub fn resolved_workers(&self) -> usize {
        if self.parallel_workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.parallel_workers
        }
    }

    /// `H(content ‖ language ‖ schema_version ‖ config)` inputs that can
    /// affect IR — everything that touches parsing or semantic layers.
    pub fn config_hash_inputs(&self) -> String {
        format!(
            "{}|{:?}|{}|{}",
            self.schema_version, self.semantic_mode, self.enable_semantic_ir, self.enable_cross_file
        )
    }

    /// Layered load: defaults → TOML file (if present) → `CODEIR_` env vars.
    pub fn load(toml_path: Option<&std::path::Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(BuildConfig::default()));
        if let Some(path) = toml_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(
            Env::prefixed("CODEIR_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
        );
        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = BuildConfig::default();
        assert_eq!(cfg.min_files_for_parallel, 5);
        assert_eq!(cfg.per_file_timeout_s, 30);
        assert_eq!(cfg.schema_version, "4.1.0");
        assert_eq!(cfg.max_file_bytes, 10_000_000);
        assert_eq!(cfg.cache.memory_max_entries, 10_000);
        assert_eq!(cfg.incremental_update_threshold, 0.3);
        assert_eq!(cfg.impact.max_depth, 5);
        assert_eq!(cfg.impact.max_affected, 1_000);
        assert!(!cfg.impact.include_test_files);
    }

    #[test]
    fn parallel_workers_zero_means_auto() {
        let mut cfg = BuildConfig::default();
        cfg.parallel_workers = 0;
        assert!(cfg.resolved_workers() >= 1);
        cfg.parallel_workers = 4;
        assert_eq!(cfg.resolved_workers(), 4);
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codeir.toml");
        std::fs::write(&path, "schema_version = \"9.9.9\"\nmax_file_bytes = 123\n").unwrap();
        let cfg = BuildConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.schema_version, "9.9.9");
        assert_eq!(cfg.max_file_bytes, 123);
        assert_eq!(cfg.min_files_for_parallel, 5);
    }

    #[test]
    fn env_override_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codeir.toml");
        std::fs::write(&path, "max_file_bytes = 111\n").unwrap();
        unsafe {
            std::env::set_var("CODEIR_MAX_FILE_BYTES", "222");
        }
        let cfg = BuildConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.max_file_bytes, 222);
        unsafe {
            std::env::remove_var("CODEIR_MAX_FILE_BYTES");
        }
    }
}
