//! C10 — build orchestrator (spec §4.8, §4.9 "Scheduling model").
//!
//! Parallel worker pool for CPU-bound per-file work (discover → parse →
//! lower → optional semantic layers, cache-checked), a serial stage for
//! the cross-file phases that need every document at once. Falls back to
//! sequential processing below `min_files_for_parallel`, matching the
//! teacher's rayon usage in its indexing pipeline.

use crate::cache::{CacheKey, IrCache};
use crate::config::BuildConfig;
use crate::depgraph::DependencyGraph;
use crate::error::{BuildError, BuildResult};
use crate::impact::{ChangeType, ImpactAnalyzer, SymbolChange};
use crate::irdoc::IRDocument;
use crate::oracle::Oracle;
use crate::resolver::{self, GlobalContext};
use crate::scope::{ScopeExpander, ScopeMode};
use crate::semantic::FunctionChange;
use crate::semgraph::SemanticGraph;
use crate::source::SourceFile;
use crate::types::{EdgeKind, Id, NodeKind};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct BuildReport {
    pub ir_documents_by_path: Vec<(Box<str>, IRDocument)>,
    pub global_ctx: GlobalContext,
    pub dependency_graph: DependencyGraph,
    pub semantic_graph: SemanticGraph,
    pub elapsed: Duration,
    pub files_processed: usize,
    pub files_failed: usize,
}

/// Atomic old→new snapshot replacement boundary (spec §5): readers always
/// see one whole `BuildReport`, never a document from the old snapshot
/// mixed with one from the new. `parking_lot::RwLock` over an `Arc` keeps
/// the write side a pointer swap and the read side lock-free-ish (a
/// shared-lock clone of the `Arc`), matching how the teacher's own
/// `IrCache` facade guards shared state.
pub struct SnapshotHandle {
    inner: parking_lot::RwLock<Arc<BuildReport>>,
}

impl SnapshotHandle {
    pub fn new(report: BuildReport) -> Self {
        Self {
            inner: parking_lot::RwLock::new(Arc::new(report)),
        }
    }

    /// The current snapshot. Cheap: clones the `Arc`, not the report.
    pub fn current(&self) -> Arc<BuildReport> {
        self.inner.read().clone()
    }

    /// Replace the snapshot in one atomic pointer swap.
    pub fn replace(&self, report: BuildReport) {
        *self.inner.write() = Arc::new(report);
    }
}

struct PerFileOutcome {
    path: PathBuf,
    result: Result<IRDocument, BuildError>,
}

/// Discover, parse/lower, optionally run semantic layers, and return one
/// document per file — steps 1-3 of spec §4.8's numbered build sequence.
fn process_file(
    path: &Path,
    repo_id: &str,
    snapshot_id: &str,
    config: &BuildConfig,
    cache: &IrCache,
    oracle: Option<&dyn Oracle>,
) -> BuildResult<IRDocument> {
    let source = SourceFile::read(path, config.max_file_bytes)?;
    let config_hash = config.config_hash_inputs();
    let cache_key = CacheKey::compute(&source.content_hash, source.language.as_str(), &config.schema_version, &config_hash);

    if let Some(cached) = cache.get(&cache_key) {
        return Ok((*cached).clone());
    }

    let mut doc = crate::generator::generate(&source, repo_id, snapshot_id, &config.schema_version);
    if config.enable_semantic_ir {
        crate::semantic::run_semantic_layers(&mut doc, &source.content, oracle);
    }

    cache.put(&cache_key, &source.content_hash, &config_hash, doc.clone());
    Ok(doc)
}

/// Re-derive cross-file resolution (step 4) plus the dependency/semantic
/// graphs (step 5) over a full document set. Shared by `build` and
/// `build_incremental`'s re-merge step, since both need the same whole-
/// snapshot indexes regardless of how the document set was assembled.
fn resolve_and_index(mut docs: Vec<IRDocument>, config: &BuildConfig) -> (GlobalContext, DependencyGraph, SemanticGraph, Vec<IRDocument>) {
    let global_ctx = if config.enable_cross_file {
        resolver::resolve(&mut docs)
    } else {
        GlobalContext::default()
    };

    let mut dependency_graph = DependencyGraph::new();
    let mut semantic_graph = SemanticGraph::new();
    for doc in &docs {
        semantic_graph.index_document(doc);
        for edge in &doc.edges {
            if edge.is_unresolved() {
                continue;
            }
            if matches!(
                edge.kind,
                EdgeKind::ImportModule | EdgeKind::ImportFrom | EdgeKind::ImportWildcard
            ) {
                if let Some(target_node) = docs.iter().flat_map(|d| &d.nodes).find(|n| n.id == edge.target_id) {
                    dependency_graph.add_dependency(&doc.file_path, &target_node.file_path);
                }
            }
        }
    }

    (global_ctx, dependency_graph, semantic_graph, docs)
}

fn build_inner(
    files: &[PathBuf],
    repo_id: &str,
    snapshot_id: &str,
    config: &BuildConfig,
    cache: &IrCache,
    oracle: Option<&dyn Oracle>,
) -> BuildReport {
    let start = Instant::now();

    let outcomes: Vec<PerFileOutcome> = if files.len() >= config.min_files_for_parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.resolved_workers())
            .build()
            .expect("thread pool construction with a positive thread count cannot fail");
        pool.install(|| {
            files
                .par_iter()
                .map(|path| PerFileOutcome {
                    path: path.clone(),
                    result: process_file(path, repo_id, snapshot_id, config, cache, oracle),
                })
                .collect()
        })
    } else {
        files
            .iter()
            .map(|path| PerFileOutcome {
                path: path.clone(),
                result: process_file(path, repo_id, snapshot_id, config, cache, oracle),
            })
            .collect()
    };

    let mut docs = Vec::new();
    let mut files_failed = 0usize;
    for outcome in outcomes {
        match outcome.result {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::warn!(path = %outcome.path.display(), error = %e, "file failed to build, skipping");
                files_failed += 1;
            }
        }
    }

    let (global_ctx, dependency_graph, semantic_graph, docs) = resolve_and_index(docs, config);

    let files_processed = docs.len();
    let ir_documents_by_path = docs.into_iter().map(|d| (d.file_path.clone(), d)).collect();

    BuildReport {
        ir_documents_by_path,
        global_ctx,
        dependency_graph,
        semantic_graph,
        elapsed: start.elapsed(),
        files_processed,
        files_failed,
    }
}

/// Run the full build pipeline over `files` (spec §4.8 steps 1-7).
pub fn build(files: &[PathBuf], repo_id: &str, snapshot_id: &str, config: &BuildConfig, cache: &IrCache) -> BuildReport {
    build_inner(files, repo_id, snapshot_id, config, cache, None)
}

/// As `build`, but consults `oracle` as the typing layer's last-resort
/// source (spec §6).
pub fn build_with_oracle(
    files: &[PathBuf],
    repo_id: &str,
    snapshot_id: &str,
    config: &BuildConfig,
    cache: &IrCache,
    oracle: &dyn Oracle,
) -> BuildReport {
    build_inner(files, repo_id, snapshot_id, config, cache, Some(oracle))
}

/// Index of non-`Calls`/import edges into the `incoming` shape
/// `ImpactAnalyzer::analyze` expects, plus a `node_id -> file_path` map,
/// scanned once over every document in a snapshot.
fn incoming_index<'a>(docs: impl IntoIterator<Item = &'a IRDocument>) -> (HashMap<Id, Vec<(Id, EdgeKind)>>, HashMap<Id, Box<str>>) {
    let mut incoming: HashMap<Id, Vec<(Id, EdgeKind)>> = HashMap::new();
    let mut node_file: HashMap<Id, Box<str>> = HashMap::new();
    for doc in docs {
        for node in &doc.nodes {
            node_file.insert(node.id, node.file_path.clone());
        }
        for edge in &doc.edges {
            if edge.is_unresolved() {
                continue;
            }
            if matches!(
                edge.kind,
                EdgeKind::ReferencesSymbol | EdgeKind::Inherits | EdgeKind::ReferencesType
            ) {
                incoming.entry(edge.target_id).or_default().push((edge.source_id, edge.kind));
            }
        }
    }
    (incoming, node_file)
}

/// C4 diff for one changed file: compares its freshly-built signatures
/// against whatever the prior snapshot had for that path (empty if the
/// file is new), producing spec §4.6's `SymbolChange`s.
fn changed_symbols_for_file(file_path: &str, old_doc: Option<&IRDocument>, new_doc: &IRDocument) -> Vec<SymbolChange> {
    let old_sigs = old_doc.map(|d| d.signatures.as_slice()).unwrap_or(&[]);
    let diff = crate::semantic::diff_functions(old_sigs, &new_doc.signatures);

    let mut changes = Vec::new();
    for (name, change) in diff {
        let change_type = match change {
            FunctionChange::Added => ChangeType::Added,
            FunctionChange::Removed => ChangeType::Deleted,
            FunctionChange::SignatureChanged => ChangeType::SignatureChanged,
            FunctionChange::BodyChanged => ChangeType::BodyChanged,
            FunctionChange::Unchanged => continue,
        };
        let node = new_doc
            .nodes
            .iter()
            .chain(old_doc.map(|d| d.nodes.as_slice()).unwrap_or(&[]))
            .find(|n| n.name.as_ref() == name.as_ref() && matches!(n.kind, NodeKind::Function | NodeKind::Method));
        if let Some(node) = node {
            changes.push(SymbolChange {
                fqn: node.fqn.clone(),
                node_id: node.id,
                change_type,
                file_path: file_path.into(),
            });
        }
    }
    changes
}

fn build_incremental_inner(
    prior: &BuildReport,
    all_files: &[PathBuf],
    changed_files: &[PathBuf],
    deleted_files: &[PathBuf],
    mode: ScopeMode,
    repo_id: &str,
    snapshot_id: &str,
    config: &BuildConfig,
    cache: &IrCache,
    oracle: Option<&dyn Oracle>,
) -> BuildReport {
    if matches!(mode, ScopeMode::Bootstrap) {
        return build_inner(all_files, repo_id, snapshot_id, config, cache, oracle);
    }

    let start = Instant::now();

    let changed_set: HashSet<Box<str>> = changed_files
        .iter()
        .map(|p| p.to_string_lossy().into_owned().into_boxed_str())
        .collect();
    let deleted_set: HashSet<Box<str>> = deleted_files
        .iter()
        .map(|p| p.to_string_lossy().into_owned().into_boxed_str())
        .collect();

    // C4: re-generate changed files first so their fresh signatures are
    // available for the diff, re-using `process_file`'s cache lookup.
    let mut fresh_by_path: HashMap<Box<str>, IRDocument> = HashMap::new();
    let mut files_failed = 0usize;
    for path in changed_files {
        match process_file(path, repo_id, snapshot_id, config, cache, oracle) {
            Ok(doc) => {
                fresh_by_path.insert(doc.file_path.clone(), doc);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "file failed to build, skipping");
                files_failed += 1;
            }
        }
    }

    let mut symbol_changes = Vec::new();
    for (path, new_doc) in &fresh_by_path {
        let old_doc = prior.ir_documents_by_path.iter().find(|(p, _)| p == path).map(|(_, d)| d);
        symbol_changes.extend(changed_symbols_for_file(path, old_doc, new_doc));
    }
    for path in &deleted_set {
        if let Some((_, old_doc)) = prior.ir_documents_by_path.iter().find(|(p, _)| p == path) {
            for sig in &old_doc.signatures {
                if let Some(node) = old_doc.node_by_id(sig.owner_node_id) {
                    symbol_changes.push(SymbolChange {
                        fqn: node.fqn.clone(),
                        node_id: node.id,
                        change_type: ChangeType::Deleted,
                        file_path: path.clone(),
                    });
                }
            }
        }
    }

    // C8: impact analysis over the prior snapshot's semantic graph.
    let (incoming, node_file) = incoming_index(prior.ir_documents_by_path.iter().map(|(_, d)| d));
    let impact = ImpactAnalyzer::new(&config.impact).analyze(&prior.semantic_graph, &incoming, &node_file, symbol_changes);

    // C9: scope expansion over the prior dependency graph.
    let total_files = prior.ir_documents_by_path.len().max(all_files.len());
    let mut rebuild_set = ScopeExpander::new(&config.scope).expand_scope(
        &changed_set,
        &deleted_set,
        mode,
        Some(total_files),
        &prior.dependency_graph,
        Some(&impact),
    );
    rebuild_set.extend(changed_set.iter().cloned());
    if rebuild_set.is_empty() {
        // Mode resolved to "whole repo" (e.g. DEEP with no prior index).
        return build_inner(all_files, repo_id, snapshot_id, config, cache, oracle);
    }

    // C10: rebuild exactly the scoped set not already rebuilt above, then
    // re-merge with whatever the prior snapshot had for everything else.
    let already_built: HashSet<&str> = fresh_by_path.keys().map(|k| k.as_ref()).collect();
    let to_rebuild: Vec<PathBuf> = all_files
        .iter()
        .filter(|p| {
            let key = p.to_string_lossy();
            rebuild_set.contains(key.as_ref()) && !already_built.contains(key.as_ref())
        })
        .cloned()
        .collect();
    let rebuilt_inner = build_inner(&to_rebuild, repo_id, snapshot_id, config, cache, oracle);
    files_failed += rebuilt_inner.files_failed;

    let mut merged_docs: Vec<IRDocument> = prior
        .ir_documents_by_path
        .iter()
        .filter(|(path, _)| !rebuild_set.contains(path) && !deleted_set.contains(path))
        .map(|(_, d)| d.clone())
        .collect();
    merged_docs.extend(fresh_by_path.into_values());
    merged_docs.extend(rebuilt_inner.ir_documents_by_path.into_iter().map(|(_, d)| d));

    let (global_ctx, dependency_graph, semantic_graph, docs) = resolve_and_index(merged_docs, config);
    let files_processed = docs.len();
    let ir_documents_by_path = docs.into_iter().map(|d| (d.file_path.clone(), d)).collect();

    BuildReport {
        ir_documents_by_path,
        global_ctx,
        dependency_graph,
        semantic_graph,
        elapsed: start.elapsed(),
        files_processed,
        files_failed,
    }
}

/// Incremental rebuild (spec §2, §4.5, §4.8): diffs `changed_files`
/// against `prior`, runs C8 impact analysis and C9 scope expansion over
/// the prior dependency graph, rebuilds only the resulting file set (C10),
/// and re-merges it with `prior`'s untouched documents. `all_files` is the
/// complete current file list, needed for DEEP's subset sizing and for a
/// BOOTSTRAP/whole-repo fallback. Returns a full new snapshot — callers
/// wanting atomic old→new replacement should go through
/// [`SnapshotHandle::replace`].
pub fn build_incremental(
    prior: &BuildReport,
    all_files: &[PathBuf],
    changed_files: &[PathBuf],
    deleted_files: &[PathBuf],
    mode: ScopeMode,
    repo_id: &str,
    snapshot_id: &str,
    config: &BuildConfig,
    cache: &IrCache,
) -> BuildReport {
    build_incremental_inner(
        prior,
        all_files,
        changed_files,
        deleted_files,
        mode,
        repo_id,
        snapshot_id,
        config,
        cache,
        None,
    )
}

/// As `build_incremental`, but consults `oracle` as the typing layer's
/// last-resort source for every rebuilt file.
#[allow(clippy::too_many_arguments)]
pub fn build_incremental_with_oracle(
    prior: &BuildReport,
    all_files: &[PathBuf],
    changed_files: &[PathBuf],
    deleted_files: &[PathBuf],
    mode: ScopeMode,
    repo_id: &str,
    snapshot_id: &str,
    config: &BuildConfig,
    cache: &IrCache,
    oracle: &dyn Oracle,
) -> BuildReport {
    build_incremental_inner(
        prior,
        all_files,
        changed_files,
        deleted_files,
        mode,
        repo_id,
        snapshot_id,
        config,
        cache,
        Some(oracle),
    )
}

/// Discover source files under `root` using the language extension set
/// (spec §4.8 step 1 "Discover"), respecting `.gitignore` the way the
/// teacher's file walk does via the `ignore` crate.
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    ignore::WalkBuilder::new(root)
        .hidden(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| crate::parsing::Language::from_path(path).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;

    #[test]
    fn build_produces_one_document_per_file_and_resolves_calls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def add(x, y):\n    return x+y\n").unwrap();
        std::fs::write(
            dir.path().join("b.py"),
            "from a import add\n\ndef main():\n    return add(1, 2)\n",
        )
        .unwrap();

        let files = discover_files(dir.path());
        assert_eq!(files.len(), 2);

        let config = BuildConfig::default();
        let cache = IrCache::from_config(&config);
        let report = build(&files, "repo", "snap", &config, &cache);

        assert_eq!(report.files_processed, 2);
        assert_eq!(report.files_failed, 0);
        assert!(report
            .ir_documents_by_path
            .iter()
            .flat_map(|(_, d)| &d.edges)
            .any(|e| e.kind == EdgeKind::Calls && !e.is_unresolved()));
    }

    #[test]
    fn cache_hit_skips_regeneration_on_second_build() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def add(x, y):\n    return x+y\n").unwrap();
        let files = discover_files(dir.path());

        let config = BuildConfig::default();
        let cache = IrCache::from_config(&config);
        let first = build(&files, "repo", "snap", &config, &cache);
        let second = build(&files, "repo", "snap", &config, &cache);

        assert_eq!(first.files_processed, second.files_processed);
    }

    #[test]
    fn incremental_build_carries_over_untouched_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def add(x, y):\n    return x+y\n").unwrap();
        std::fs::write(
            dir.path().join("b.py"),
            "from a import add\n\ndef main():\n    return add(1, 2)\n",
        )
        .unwrap();
        let files = discover_files(dir.path());

        let config = BuildConfig::default();
        let cache = IrCache::from_config(&config);
        let prior = build(&files, "repo", "snap1", &config, &cache);

        std::fs::write(dir.path().join("a.py"), "def add(x, y):\n    return x + y  # tweaked\n").unwrap();
        let changed = vec![dir.path().join("a.py")];

        let updated = build_incremental(
            &prior,
            &files,
            &changed,
            &[],
            ScopeMode::Fast,
            "repo",
            "snap2",
            &config,
            &cache,
        );

        assert_eq!(updated.files_processed, 2);
        let b_doc = updated
            .ir_documents_by_path
            .iter()
            .find(|(p, _)| p.ends_with("b.py"))
            .unwrap();
        assert!(b_doc.1.edges.iter().any(|e| e.kind == EdgeKind::Calls && !e.is_unresolved()));
    }

    #[test]
    fn incremental_build_bootstrap_mode_rebuilds_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();
        let files = discover_files(dir.path());
        let config = BuildConfig::default();
        let cache = IrCache::from_config(&config);
        let prior = build(&files, "repo", "snap1", &config, &cache);

        let rebuilt = build_incremental(
            &prior,
            &files,
            &[],
            &[],
            ScopeMode::Bootstrap,
            "repo",
            "snap2",
            &config,
            &cache,
        );
        assert_eq!(rebuilt.files_processed, 1);
    }

    #[test]
    fn snapshot_handle_replace_swaps_atomically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();
        let files = discover_files(dir.path());
        let config = BuildConfig::default();
        let cache = IrCache::from_config(&config);

        let first = build(&files, "repo", "snap1", &config, &cache);
        let handle = SnapshotHandle::new(first);
        assert_eq!(handle.current().files_processed, 1);

        let second = build(&files, "repo", "snap2", &config, &cache);
        handle.replace(second);
        assert_eq!(handle.current().files_processed, 1);
    }
}
