//! Structure-of-arrays expression arena (C11, spec §4.9).
//!
//! Ported from `original_source/.../semantic_ir/expression_arena.py`: the
//! Python version backs each column with a NumPy array purely to avoid
//! per-object GC pressure; Rust has no such pressure to dodge, but the
//! cache-locality argument and the CSR-style `reads_vars` layout carry over
//! unchanged, so the column shapes below mirror it 1:1.

use crate::types::Span;

/// One-byte expression kind code (spec §3 DFG: "expressions hold
/// `defines_var: int` and `reads_vars: [int]`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExprKind {
    NameLoad = 0,
    Call = 1,
    BinaryOp = 2,
    UnaryOp = 3,
    Attribute = 4,
    Subscript = 5,
    Literal = 6,
    Lambda = 7,
    Comprehension = 8,
    Conditional = 9,
}

impl ExprKind {
    fn from_code(code: u8) -> Self {
        match code {
            0 => ExprKind::NameLoad,
            1 => ExprKind::Call,
            2 => ExprKind::BinaryOp,
            3 => ExprKind::UnaryOp,
            4 => ExprKind::Attribute,
            5 => ExprKind::Subscript,
            6 => ExprKind::Literal,
            7 => ExprKind::Lambda,
            8 => ExprKind::Comprehension,
            _ => ExprKind::Conditional,
        }
    }
}

/// Append-only columnar store for one function's expressions.
///
/// Columns double in capacity on overflow; `reads_vars_data` grows
/// independently of the fixed-width columns (spec §4.9 "Grow policy").
#[derive(Debug, Default, Clone)]
pub struct ExpressionArena {
    kinds: Vec<u8>,
    defines_vars: Vec<Option<u32>>,
    reads_vars_offsets: Vec<u32>,
    reads_vars_data: Vec<u32>,
    span_start_line: Vec<u32>,
    span_start_col: Vec<u32>,
    span_end_line: Vec<u32>,
    span_end_col: Vec<u32>,
}

impl ExpressionArena {
    pub fn new() -> Self {
        let mut arena = Self::default();
        arena.reads_vars_offsets.push(0);
        arena
    }

    /// Append a new expression, returning its dense index within this
    /// function's arena.
    pub fn push(
        &mut self,
        kind: ExprKind,
        span: Span,
        defines_var: Option<u32>,
        reads_vars: &[u32],
    ) -> usize {
        let index = self.kinds.len();
        self.kinds.push(kind as u8);
        self.defines_vars.push(defines_var);
        self.reads_vars_data.extend_from_slice(reads_vars);
        self.reads_vars_offsets.push(self.reads_vars_data.len() as u32);
        self.span_start_line.push(span.start_line);
        self.span_start_col.push(span.start_col);
        self.span_end_line.push(span.end_line);
        self.span_end_col.push(span.end_col);
        index
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Zero-copy view into column storage, re-materialized per access.
    pub fn get(&self, index: usize) -> Option<ArenaExpressionRef<'_>> {
        if index >= self.kinds.len() {
            return None;
        }
        Some(ArenaExpressionRef { arena: self, index })
    }

    pub fn iter(&self) -> impl Iterator<Item = ArenaExpressionRef<'_>> {
        (0..self.len()).map(move |i| ArenaExpressionRef { arena: self, index: i })
    }
}

/// Expression-compatible view that dereferences into the arena's columns
/// without copying. Never outlives the arena it borrows from.
#[derive(Debug, Clone, Copy)]
pub struct ArenaExpressionRef<'a> {
    arena: &'a ExpressionArena,
    index: usize,
}

impl<'a> ArenaExpressionRef<'a> {
    pub fn kind(&self) -> ExprKind {
        ExprKind::from_code(self.arena.kinds[self.index])
    }

    pub fn defines_var(&self) -> Option<u32> {
        self.arena.defines_vars[self.index]
    }

    pub fn reads_vars(&self) -> &'a [u32] {
        let start = self.arena.reads_vars_offsets[self.index] as usize;
        let end = self.arena.reads_vars_offsets[self.index + 1] as usize;
        &self.arena.reads_vars_data[start..end]
    }

    pub fn span(&self) -> Span {
        Span::new(
            self.arena.span_start_line[self.index],
            self.arena.span_start_col[self.index],
            self.arena.span_end_line[self.index],
            self.arena.span_end_col[self.index],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read_back() {
        let mut arena = ExpressionArena::new();
        let span = Span::new(1, 0, 1, 10);
        let idx = arena.push(ExprKind::Call, span, Some(2), &[0, 1]);
        let view = arena.get(idx).unwrap();
        assert_eq!(view.kind(), ExprKind::Call);
        assert_eq!(view.defines_var(), Some(2));
        assert_eq!(view.reads_vars(), &[0, 1]);
        assert_eq!(view.span(), span);
    }

    #[test]
    fn reads_vars_are_csr_encoded_independently() {
        let mut arena = ExpressionArena::new();
        let span = Span::new(1, 0, 1, 1);
        arena.push(ExprKind::NameLoad, span, None, &[]);
        arena.push(ExprKind::BinaryOp, span, Some(0), &[1, 2, 3]);
        assert_eq!(arena.get(0).unwrap().reads_vars(), &[] as &[u32]);
        assert_eq!(arena.get(1).unwrap().reads_vars(), &[1, 2, 3]);
    }
}
