//! `codeir` CLI: build a snapshot's layered IR, query impact, or expand
//! rebuild scope — a thin driver over the library's orchestrator.

use clap::{Parser, Subcommand};
use codeir::config::BuildConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codeir", version, about = "Layered IR and semantic graph engine")]
struct Cli {
    /// Path to a TOML config file (defaults merge with env overrides regardless).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the layered IR for a repository root.
    Build {
        root: PathBuf,
        #[arg(long, default_value = "default-repo")]
        repo_id: String,
        #[arg(long, default_value = "snapshot")]
        snapshot_id: String,
    },
    /// Print direct/transitive affected symbols for a changed function.
    Impact {
        root: PathBuf,
        /// Fully-qualified name of the changed symbol, e.g. `a.add`.
        symbol_fqn: String,
    },
    /// Print the file set a rebuild would cover for a given mode.
    Scope {
        root: PathBuf,
        #[arg(value_enum)]
        mode: ScopeModeArg,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum ScopeModeArg {
    Fast,
    Balanced,
    Deep,
    Bootstrap,
    Repair,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BuildConfig::load(cli.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?;
    codeir::logging::init();

    match cli.command {
        Command::Build {
            root,
            repo_id,
            snapshot_id,
        } => run_build(&root, &repo_id, &snapshot_id, &config),
        Command::Impact { root, symbol_fqn } => run_impact(&root, &symbol_fqn, &config),
        Command::Scope { root, mode } => run_scope(&root, mode, &config),
    }
}

fn run_build(root: &std::path::Path, repo_id: &str, snapshot_id: &str, config: &BuildConfig) -> anyhow::Result<()> {
    let files = codeir::orchestrator::discover_files(root);
    let cache = codeir::cache::IrCache::from_config(config);
    let report = codeir::orchestrator::build(&files, repo_id, snapshot_id, config, &cache);

    tracing::info!(
        files_processed = report.files_processed,
        files_failed = report.files_failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "build complete"
    );
    println!(
        "{}",
        serde_json::json!({
            "files_processed": report.files_processed,
            "files_failed": report.files_failed,
            "elapsed_ms": report.elapsed.as_millis(),
        })
    );
    Ok(())
}

fn run_impact(root: &std::path::Path, symbol_fqn: &str, config: &BuildConfig) -> anyhow::Result<()> {
    let files = codeir::orchestrator::discover_files(root);
    let cache = codeir::cache::IrCache::from_config(config);
    let report = codeir::orchestrator::build(&files, "default-repo", "snapshot", config, &cache);

    let Some((_, node_id)) = report.global_ctx.symbol_table.get(symbol_fqn) else {
        anyhow::bail!("symbol '{symbol_fqn}' not found in this snapshot");
    };

    let file_path = report
        .ir_documents_by_path
        .iter()
        .find(|(_, doc)| doc.nodes.iter().any(|n| n.id == *node_id))
        .map(|(path, _)| path.clone())
        .unwrap_or_default();

    let change = codeir::impact::SymbolChange {
        fqn: symbol_fqn.into(),
        node_id: *node_id,
        change_type: codeir::impact::ChangeType::SignatureChanged,
        file_path,
    };

    let mut node_file = std::collections::HashMap::new();
    for (path, doc) in &report.ir_documents_by_path {
        for node in &doc.nodes {
            node_file.insert(node.id, path.clone());
        }
    }

    let analyzer = codeir::impact::ImpactAnalyzer::new(&config.impact);
    let result = analyzer.analyze(
        &report.semantic_graph,
        &std::collections::HashMap::new(),
        &node_file,
        vec![change],
    );

    println!(
        "{}",
        serde_json::json!({
            "direct_affected": result.direct_affected.len(),
            "transitive_affected": result.transitive_affected.len(),
            "affected_files": result.affected_files,
        })
    );
    Ok(())
}

fn run_scope(root: &std::path::Path, mode: ScopeModeArg, config: &BuildConfig) -> anyhow::Result<()> {
    let files = codeir::orchestrator::discover_files(root);
    let cache = codeir::cache::IrCache::from_config(config);
    let report = codeir::orchestrator::build(&files, "default-repo", "snapshot", config, &cache);

    let scope_mode = match mode {
        ScopeModeArg::Fast => codeir::scope::ScopeMode::Fast,
        ScopeModeArg::Balanced => codeir::scope::ScopeMode::Balanced,
        ScopeModeArg::Deep => codeir::scope::ScopeMode::Deep,
        ScopeModeArg::Bootstrap => codeir::scope::ScopeMode::Bootstrap,
        ScopeModeArg::Repair => codeir::scope::ScopeMode::Repair,
    };

    let changed: std::collections::HashSet<Box<str>> =
        report.ir_documents_by_path.iter().map(|(path, _)| path.clone()).collect();

    let expander = codeir::scope::ScopeExpander::new(&config.scope);
    let scope = expander.expand_scope(
        &changed,
        &std::collections::HashSet::new(),
        scope_mode,
        Some(report.files_processed),
        &report.dependency_graph,
        None,
    );

    println!("{}", serde_json::to_string_pretty(&scope)?);
    Ok(())
}
