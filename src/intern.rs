//! Process-wide interning: spans, strings (FQNs/paths), per-function
//! variable names.
//!
//! Generalizes the teacher's `StringTable` (`src/symbol/mod.rs`), which
//! interns symbol names into an offset/null-terminator byte buffer, into
//! the singletons spec §9 calls for ("the few process-wide items... are
//! explicit singletons initialized before any worker is spawned; workers
//! receive handles by value").

use crate::types::Span;
use dashmap::DashMap;
use std::sync::Arc;

/// Value-equal spans share storage; returns the canonical representative.
#[derive(Debug, Default, Clone)]
pub struct SpanPool {
    table: Arc<DashMap<Span, Span>>,
}

impl SpanPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, span: Span) -> Span {
        *self.table.entry(span).or_insert(span)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Interns arbitrary strings (FQNs, file paths) to reference-counted slices.
#[derive(Debug, Default, Clone)]
pub struct StringInterner {
    table: Arc<DashMap<Box<str>, Arc<str>>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, s: &str) -> Arc<str> {
        if let Some(existing) = self.table.get(s) {
            return existing.clone();
        }
        let arc: Arc<str> = Arc::from(s);
        self.table.insert(s.into(), arc.clone());
        arc
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Compresses variable names within a single function to dense integer ids.
///
/// One instance per function being built; never shared across workers
/// (spec §4.9, §5 "Arenas... are never shared across workers during
/// construction").
#[derive(Debug, Default)]
pub struct VarRegistry {
    names: Vec<Box<str>>,
    by_name: std::collections::HashMap<Box<str>, u32>,
}

impl VarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dense id for `name`, allocating one if this is the first
    /// sighting within this function.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.into());
        self.by_name.insert(name.into(), id);
        id
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_pool_dedupes_equal_spans() {
        let pool = SpanPool::new();
        let a = pool.intern(Span::new(1, 0, 1, 5));
        let b = pool.intern(Span::new(1, 0, 1, 5));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn string_interner_dedupes() {
        let interner = StringInterner::new();
        let a = interner.intern("pkg.mod.func");
        let b = interner.intern("pkg.mod.func");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn var_registry_assigns_dense_ids() {
        let mut reg = VarRegistry::new();
        assert_eq!(reg.intern("x"), 0);
        assert_eq!(reg.intern("y"), 1);
        assert_eq!(reg.intern("x"), 0);
        assert_eq!(reg.name_of(1), Some("y"));
    }
}
