//! COO / CSR storage blocks.
//!
//! Indices are 32-bit, counts are 64-bit (`usize` lengths on 64-bit hosts),
//! value widths come from the element type descriptor. Blocks produced by
//! algorithms must satisfy `validate`; the dispatcher treats a violation as
//! a fatal internal-invariant error.

use core_types::{EngineError, Result};

/// Coordinate-format sparse vector: parallel `rows` / `vals` arrays.
///
/// After normalization rows are sorted ascending with no duplicates and
/// `vals.len() == rows.len() * byte_size`. Pattern operands keep `vals`
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooVec {
    pub rows: Vec<u32>,
    pub vals: Vec<u8>,
}

impl CooVec {
    pub fn new(rows: Vec<u32>, vals: Vec<u8>) -> Self {
        Self { rows, vals }
    }

    pub fn nvals(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn validate(&self, n_rows: u64, byte_size: usize) -> Result<()> {
        if self.vals.len() != self.rows.len() * byte_size {
            return Err(EngineError::InvalidState(format!(
                "coo vec: vals bytes {} != nvals {} * byte size {}",
                self.vals.len(),
                self.rows.len(),
                byte_size
            )));
        }
        for pair in self.rows.windows(2) {
            if pair[0] >= pair[1] {
                return Err(EngineError::InvalidState(format!(
                    "coo vec: rows not strictly increasing at {} -> {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let Some(&last) = self.rows.last() {
            if u64::from(last) >= n_rows {
                return Err(EngineError::InvalidState(format!(
                    "coo vec: row {last} out of bounds {n_rows}"
                )));
            }
        }
        Ok(())
    }
}

/// Coordinate-format sparse matrix: parallel `rows` / `cols` / `vals`.
///
/// Normalized blocks are sorted by `(row, col)` with no duplicate pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooMtx {
    pub rows: Vec<u32>,
    pub cols: Vec<u32>,
    pub vals: Vec<u8>,
}

impl CooMtx {
    pub fn new(rows: Vec<u32>, cols: Vec<u32>, vals: Vec<u8>) -> Self {
        Self { rows, cols, vals }
    }

    pub fn nvals(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn validate(&self, n_rows: u64, n_cols: u64, byte_size: usize) -> Result<()> {
        if self.rows.len() != self.cols.len() {
            return Err(EngineError::InvalidState(format!(
                "coo mtx: rows {} != cols {}",
                self.rows.len(),
                self.cols.len()
            )));
        }
        if self.vals.len() != self.rows.len() * byte_size {
            return Err(EngineError::InvalidState(format!(
                "coo mtx: vals bytes {} != nvals {} * byte size {}",
                self.vals.len(),
                self.rows.len(),
                byte_size
            )));
        }
        for i in 1..self.rows.len() {
            let prev = (self.rows[i - 1], self.cols[i - 1]);
            let cur = (self.rows[i], self.cols[i]);
            if prev >= cur {
                return Err(EngineError::InvalidState(format!(
                    "coo mtx: entries not sorted/unique at {prev:?} -> {cur:?}"
                )));
            }
        }
        for (&r, &c) in self.rows.iter().zip(&self.cols) {
            if u64::from(r) >= n_rows || u64::from(c) >= n_cols {
                return Err(EngineError::InvalidState(format!(
                    "coo mtx: entry ({r},{c}) out of bounds ({n_rows},{n_cols})"
                )));
            }
        }
        Ok(())
    }
}

/// Compressed-sparse-row matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrMtx {
    pub offsets: Vec<u32>,
    pub cols: Vec<u32>,
    pub vals: Vec<u8>,
}

impl CsrMtx {
    pub fn new(offsets: Vec<u32>, cols: Vec<u32>, vals: Vec<u8>) -> Self {
        Self {
            offsets,
            cols,
            vals,
        }
    }

    pub fn nvals(&self) -> u64 {
        self.cols.len() as u64
    }

    pub fn row_range(&self, row: u32) -> std::ops::Range<usize> {
        self.offsets[row as usize] as usize..self.offsets[row as usize + 1] as usize
    }

    pub fn validate(&self, n_rows: u64, n_cols: u64, byte_size: usize) -> Result<()> {
        if self.offsets.len() as u64 != n_rows + 1 {
            return Err(EngineError::InvalidState(format!(
                "csr: offsets len {} != nrows {} + 1",
                self.offsets.len(),
                n_rows
            )));
        }
        if self.offsets.first() != Some(&0) {
            return Err(EngineError::InvalidState("csr: offsets[0] != 0".into()));
        }
        if *self.offsets.last().unwrap_or(&0) as usize != self.cols.len() {
            return Err(EngineError::InvalidState(format!(
                "csr: offsets[nrows] {} != nvals {}",
                self.offsets.last().unwrap_or(&0),
                self.cols.len()
            )));
        }
        for pair in self.offsets.windows(2) {
            if pair[0] > pair[1] {
                return Err(EngineError::InvalidState(format!(
                    "csr: offsets decrease at {} -> {}",
                    pair[0], pair[1]
                )));
            }
        }
        if self.vals.len() != self.cols.len() * byte_size {
            return Err(EngineError::InvalidState(format!(
                "csr: vals bytes {} != nvals {} * byte size {}",
                self.vals.len(),
                self.cols.len(),
                byte_size
            )));
        }
        if self.cols.iter().any(|&c| u64::from(c) >= n_cols) {
            return Err(EngineError::InvalidState("csr: col out of bounds".into()));
        }
        Ok(())
    }
}
