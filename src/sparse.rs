//! Dynamic sparse symmetric matrix used as the live Hessian.
//!
//! Row-of-map storage: every off-diagonal write materializes both `(i, j)`
//! and `(j, i)`, so iterating one row lists every neighbor of a node exactly
//! once. The edge-pushing sweep relies on three operations being cheap:
//! random entry updates, iteration over one row, and deletion of a whole
//! row/column pair.

use std::collections::BTreeMap;

/// Map-based sparse symmetric matrix.
#[derive(Debug, Clone, Default)]
pub struct SparseSymMat {
    width: usize,
    rows: BTreeMap<usize, BTreeMap<usize, f64>>,
}

impl SparseSymMat {
    /// Empty matrix of the given width.
    pub fn new(width: usize) -> Self {
        SparseSymMat {
            width,
            rows: BTreeMap::new(),
        }
    }

    /// Number of rows (equals the number of columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of stored entries, symmetric duplicates included.
    pub fn stored_len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Read an entry, 0.0 when absent.
    pub fn read(&self, i: usize, j: usize) -> f64 {
        self.rows
            .get(&i)
            .and_then(|r| r.get(&j))
            .copied()
            .unwrap_or(0.0)
    }

    /// Row `i` as a map from column to value, `None` when the row is empty.
    pub fn row(&self, i: usize) -> Option<&BTreeMap<usize, f64>> {
        self.rows.get(&i)
    }

    /// Snapshot of row `i` as `(column, value)` pairs in column order.
    pub fn row_entries(&self, i: usize) -> Vec<(usize, f64)> {
        match self.rows.get(&i) {
            Some(r) => r.iter().map(|(&j, &v)| (j, v)).collect(),
            None => Vec::new(),
        }
    }

    /// Add `x` to entry `(i, j)`, mirroring onto `(j, i)`. A zero increment
    /// is a no-op and inserts nothing.
    pub fn add(&mut self, i: usize, j: usize, x: f64) {
        if x == 0.0 {
            return;
        }
        *self.rows.entry(i).or_default().entry(j).or_insert(0.0) += x;
        if i != j {
            *self.rows.entry(j).or_default().entry(i).or_insert(0.0) += x;
        }
    }

    /// Set entry `(i, j)` (and `(j, i)`) to `x`. Setting zero removes the
    /// entry and drops rows that become empty.
    pub fn set(&mut self, i: usize, j: usize, x: f64) {
        if x == 0.0 {
            self.remove(i, j);
            return;
        }
        self.rows.entry(i).or_default().insert(j, x);
        if i != j {
            self.rows.entry(j).or_default().insert(i, x);
        }
    }

    fn remove(&mut self, i: usize, j: usize) {
        if let Some(r) = self.rows.get_mut(&i) {
            r.remove(&j);
            if r.is_empty() {
                self.rows.remove(&i);
            }
        }
        if i != j {
            if let Some(r) = self.rows.get_mut(&j) {
                r.remove(&i);
                if r.is_empty() {
                    self.rows.remove(&j);
                }
            }
        }
    }

    /// Erase row `i`, column `i`, and the diagonal entry in one pass.
    pub fn erase(&mut self, i: usize) {
        let row_i = match self.rows.remove(&i) {
            Some(r) => r,
            None => return,
        };
        for (&j, _) in row_i.iter() {
            if j == i {
                continue;
            }
            if let Some(row_j) = self.rows.get_mut(&j) {
                row_j.remove(&i);
                if row_j.is_empty() {
                    self.rows.remove(&j);
                }
            }
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Iterate over all stored entries as `(row, col, value)`, symmetric
    /// duplicates included, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .flat_map(|(&i, r)| r.iter().map(move |(&j, &v)| (i, j, v)))
    }

    /// Dense rendition, row-major. For diagnostics and tests.
    pub fn to_dense(&self) -> Vec<f64> {
        let n = self.width;
        let mut out = vec![0.0; n * n];
        for (i, j, v) in self.iter() {
            out[i * n + j] = v;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_way_consistency() {
        let mut m = SparseSymMat::new(4);
        m.add(0, 2, 1.5);
        assert_eq!(m.read(0, 2), 1.5);
        assert_eq!(m.read(2, 0), 1.5);
        m.add(2, 0, 0.5);
        assert_eq!(m.read(0, 2), 2.0);
        assert_eq!(m.read(2, 0), 2.0);
    }

    #[test]
    fn set_zero_removes_both_sides() {
        let mut m = SparseSymMat::new(3);
        m.set(0, 1, 2.0);
        m.set(0, 1, 0.0);
        assert!(m.row(0).is_none());
        assert!(m.row(1).is_none());
        assert_eq!(m.stored_len(), 0);
    }

    #[test]
    fn erase_removes_row_column_and_diagonal() {
        let mut m = SparseSymMat::new(4);
        m.add(1, 1, 3.0);
        m.add(1, 2, 1.0);
        m.add(1, 3, 2.0);
        m.add(2, 3, 5.0);
        m.erase(1);
        assert_eq!(m.read(1, 1), 0.0);
        assert_eq!(m.read(1, 2), 0.0);
        assert_eq!(m.read(2, 1), 0.0);
        assert_eq!(m.read(3, 1), 0.0);
        // Unrelated entries survive.
        assert_eq!(m.read(2, 3), 5.0);
        assert_eq!(m.read(3, 2), 5.0);
    }

    #[test]
    fn zero_increment_inserts_nothing() {
        let mut m = SparseSymMat::new(2);
        m.add(0, 1, 0.0);
        assert_eq!(m.stored_len(), 0);
    }
}
