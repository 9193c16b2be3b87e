//! Stand-in base-data access layer.
//!
//! Real deployments would back these with a storage transaction; here the
//! sources enumerate deterministic values so that resolution behavior is
//! reproducible. Enumeration order is stable: row `i` precedes row `i + 1`.
//! Both sources are plain lazy iterators, safe to abandon before
//! exhaustion.

use crate::config::Pagination;
use crate::message::ConceptMap;

/// Scalar base data for a single pattern: yields `offset + i` for
/// `i` in `0..size`.
#[derive(Debug, Clone)]
pub struct ScalarTraversal {
    cursor: i64,
    remaining: u64,
}

impl ScalarTraversal {
    pub fn new(page: Pagination) -> Self {
        Self {
            cursor: page.offset,
            remaining: page.size,
        }
    }
}

impl Iterator for ScalarTraversal {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.cursor;
        self.cursor += 1;
        self.remaining -= 1;
        Some(value)
    }
}

/// Tuple base data for a conjunction: row `i` binds every pattern `p` of
/// the conjunction to `p + offset + i`.
#[derive(Debug, Clone)]
pub struct TupleTraversal {
    patterns: Vec<i64>,
    offset: i64,
    row: u64,
    size: u64,
}

impl TupleTraversal {
    pub fn new(patterns: Vec<i64>, page: Pagination) -> Self {
        Self {
            patterns,
            offset: page.offset,
            row: 0,
            size: page.size,
        }
    }
}

impl Iterator for TupleTraversal {
    type Item = ConceptMap;

    fn next(&mut self) -> Option<ConceptMap> {
        if self.row >= self.size {
            return None;
        }
        let shift = self.offset + self.row as i64;
        self.row += 1;
        Some(self.patterns.iter().map(|pattern| pattern + shift).collect())
    }
}
