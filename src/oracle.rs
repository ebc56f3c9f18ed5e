//! C6-adjacent collaborator: the external language oracle contract (spec
//! §6 "Language oracle contract").
//!
//! Not implemented here — gopls/JDT.LS/Pyright-style adapters are named
//! as external collaborators, out of scope for this crate. What's modeled
//! is the trait boundary the typing layer's lowest-confidence source
//! (`crate::irdoc::TypeSource::Oracle`) calls through, so a real adapter
//! can be plugged in without touching `crate::semantic`.

use crate::types::Span;
use std::time::Duration;

/// Result of a `hover` query: the oracle's best guess at an expression's
/// type, plus whatever doc text it has for it.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverInfo {
    pub type_string: String,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub file_path: String,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub severity: DiagnosticSeverity,
}

/// Spec §6's default oracle timeout: "best-effort, stateless between
/// calls; timeouts default to 5s; failures are logged and ignored."
/// Callers own enforcing this — the trait itself doesn't, since a sync
/// trait object can't race a timer on its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Optional, best-effort, stateless-between-calls language server
/// adapter. The core never treats an oracle failure as fatal: a `None`/
/// empty result degrades the typing layer to a lower-confidence source,
/// never a build error.
pub trait Oracle: Send + Sync {
    fn hover(&self, file: &str, line: u32, col: u32) -> Option<HoverInfo>;
    fn definition(&self, file: &str, line: u32, col: u32) -> Vec<Location>;
    fn references(&self, file: &str, line: u32, col: u32) -> Vec<Location>;
    fn diagnostics(&self, file: &str) -> Vec<Diagnostic>;
}

/// No oracle configured: every query degrades to empty/`None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOracle;

impl Oracle for NullOracle {
    fn hover(&self, _file: &str, _line: u32, _col: u32) -> Option<HoverInfo> {
        None
    }

    fn definition(&self, _file: &str, _line: u32, _col: u32) -> Vec<Location> {
        Vec::new()
    }

    fn references(&self, _file: &str, _line: u32, _col: u32) -> Vec<Location> {
        Vec::new()
    }

    fn diagnostics(&self, _file: &str) -> Vec<Diagnostic> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_oracle_degrades_to_empty_everywhere() {
        let oracle = NullOracle;
        assert_eq!(oracle.hover("a.py", 1, 0), None);
        assert!(oracle.definition("a.py", 1, 0).is_empty());
        assert!(oracle.references("a.py", 1, 0).is_empty());
        assert!(oracle.diagnostics("a.py").is_empty());
    }

    #[test]
    fn oracle_trait_object_is_usable_dynamically() {
        let oracle: &dyn Oracle = &NullOracle;
        assert!(oracle.hover("a.py", 1, 0).is_none());
    }
}
