//! Shared-ownership operand handles.
//!
//! A handle owns its element type and logical shape forever; the storage
//! variant behind the `RwLock` is what algorithms swap when they produce
//! outputs. Schedule tasks hold `Arc` clones, so identity comparisons
//! (`Arc::ptr_eq`) are how the dispatcher detects overlapping outputs within
//! a step.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::trace;

use core_types::{EngineError, Result, Scalar, TypeRef, VOID};

use crate::block::{CooMtx, CooVec, CsrMtx};

#[derive(Debug, Clone, Default)]
pub enum VectorStorage {
    #[default]
    Empty,
    Coo(CooVec),
}

#[derive(Debug, Clone, Default)]
pub enum MatrixStorage {
    #[default]
    Empty,
    Coo(CooMtx),
    Csr(CsrMtx),
}

/// Sparse vector handle.
#[derive(Debug)]
pub struct Vector {
    ty: TypeRef,
    n_rows: u64,
    storage: RwLock<VectorStorage>,
}

pub type VectorRef = Arc<Vector>;

impl Vector {
    pub fn new(n_rows: u64, ty: TypeRef) -> VectorRef {
        Arc::new(Vector {
            ty,
            n_rows,
            storage: RwLock::new(VectorStorage::Empty),
        })
    }

    /// Typed construction from host entries; entries must be pre-sorted by
    /// row with no duplicates (the engine normalizes algorithm outputs, not
    /// user inputs).
    pub fn from_entries<T: Scalar>(n_rows: u64, rows: Vec<u32>, vals: &[T]) -> Result<VectorRef> {
        if rows.len() != vals.len() {
            return Err(EngineError::InvalidArgument(format!(
                "vector entries: {} rows vs {} vals",
                rows.len(),
                vals.len()
            )));
        }
        let block = CooVec::new(rows, T::encode_vec(vals));
        block.validate(n_rows, T::BYTE_SIZE)?;
        let v = Vector::new(n_rows, T::ttype());
        *v.storage.write() = VectorStorage::Coo(block);
        Ok(v)
    }

    /// Pattern (value-less) vector over the `VOID` type.
    pub fn from_pattern(n_rows: u64, rows: Vec<u32>) -> Result<VectorRef> {
        let block = CooVec::new(rows, Vec::new());
        block.validate(n_rows, 0)?;
        let v = Vector::new(n_rows, VOID.clone());
        *v.storage.write() = VectorStorage::Coo(block);
        Ok(v)
    }

    pub fn ttype(&self) -> &TypeRef {
        &self.ty
    }

    pub fn n_rows(&self) -> u64 {
        self.n_rows
    }

    pub fn nvals(&self) -> u64 {
        match &*self.storage.read() {
            VectorStorage::Empty => 0,
            VectorStorage::Coo(b) => b.nvals(),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, VectorStorage> {
        self.storage.read()
    }

    /// Replace storage with a validated COO block (algorithm output path).
    pub fn store_coo(&self, block: CooVec) -> Result<()> {
        block.validate(self.n_rows, self.ty.byte_size())?;
        trace!(target: "storage", nvals = block.rows.len(), "vector store coo");
        *self.storage.write() = VectorStorage::Coo(block);
        Ok(())
    }

    pub fn clear(&self) {
        *self.storage.write() = VectorStorage::Empty;
    }

    /// Host readback for results and tests.
    pub fn to_entries<T: Scalar>(&self) -> Result<(Vec<u32>, Vec<T>)> {
        if self.ty.code() != T::CODE {
            return Err(EngineError::InvalidArgument(format!(
                "vector is {}, requested {}",
                self.ty.code(),
                T::CODE
            )));
        }
        match &*self.storage.read() {
            VectorStorage::Empty => Ok((Vec::new(), Vec::new())),
            VectorStorage::Coo(b) => Ok((b.rows.clone(), T::decode_vec(&b.vals))),
        }
    }

    /// Row set only; valid for any element type.
    pub fn to_rows(&self) -> Vec<u32> {
        match &*self.storage.read() {
            VectorStorage::Empty => Vec::new(),
            VectorStorage::Coo(b) => b.rows.clone(),
        }
    }
}

/// Sparse matrix handle.
#[derive(Debug)]
pub struct Matrix {
    ty: TypeRef,
    n_rows: u64,
    n_cols: u64,
    storage: RwLock<MatrixStorage>,
}

pub type MatrixRef = Arc<Matrix>;

impl Matrix {
    pub fn new(n_rows: u64, n_cols: u64, ty: TypeRef) -> MatrixRef {
        Arc::new(Matrix {
            ty,
            n_rows,
            n_cols,
            storage: RwLock::new(MatrixStorage::Empty),
        })
    }

    pub fn from_entries<T: Scalar>(
        n_rows: u64,
        n_cols: u64,
        rows: Vec<u32>,
        cols: Vec<u32>,
        vals: &[T],
    ) -> Result<MatrixRef> {
        if rows.len() != vals.len() {
            return Err(EngineError::InvalidArgument(format!(
                "matrix entries: {} rows vs {} vals",
                rows.len(),
                vals.len()
            )));
        }
        let block = CooMtx::new(rows, cols, T::encode_vec(vals));
        block.validate(n_rows, n_cols, T::BYTE_SIZE)?;
        let m = Matrix::new(n_rows, n_cols, T::ttype());
        *m.storage.write() = MatrixStorage::Coo(block);
        Ok(m)
    }

    pub fn from_pattern(
        n_rows: u64,
        n_cols: u64,
        rows: Vec<u32>,
        cols: Vec<u32>,
    ) -> Result<MatrixRef> {
        let block = CooMtx::new(rows, cols, Vec::new());
        block.validate(n_rows, n_cols, 0)?;
        let m = Matrix::new(n_rows, n_cols, VOID.clone());
        *m.storage.write() = MatrixStorage::Coo(block);
        Ok(m)
    }

    pub fn ttype(&self) -> &TypeRef {
        &self.ty
    }

    pub fn n_rows(&self) -> u64 {
        self.n_rows
    }

    pub fn n_cols(&self) -> u64 {
        self.n_cols
    }

    pub fn nvals(&self) -> u64 {
        match &*self.storage.read() {
            MatrixStorage::Empty => 0,
            MatrixStorage::Coo(b) => b.nvals(),
            MatrixStorage::Csr(b) => b.nvals(),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, MatrixStorage> {
        self.storage.read()
    }

    pub fn store_coo(&self, block: CooMtx) -> Result<()> {
        block.validate(self.n_rows, self.n_cols, self.ty.byte_size())?;
        trace!(target: "storage", nvals = block.rows.len(), "matrix store coo");
        *self.storage.write() = MatrixStorage::Coo(block);
        Ok(())
    }

    pub fn store_csr(&self, block: CsrMtx) -> Result<()> {
        block.validate(self.n_rows, self.n_cols, self.ty.byte_size())?;
        trace!(target: "storage", nvals = block.cols.len(), "matrix store csr");
        *self.storage.write() = MatrixStorage::Csr(block);
        Ok(())
    }

    pub fn clear(&self) {
        *self.storage.write() = MatrixStorage::Empty;
    }
}

/// Scalar value container (reduction outputs, assign sources).
#[derive(Debug)]
pub struct ScalarVal {
    ty: TypeRef,
    bytes: RwLock<Vec<u8>>,
}

pub type ScalarValRef = Arc<ScalarVal>;

impl ScalarVal {
    pub fn new(ty: TypeRef) -> ScalarValRef {
        Arc::new(ScalarVal {
            ty,
            bytes: RwLock::new(Vec::new()),
        })
    }

    pub fn from_value<T: Scalar>(value: T) -> ScalarValRef {
        let s = ScalarVal::new(T::ttype());
        let mut bytes = vec![0u8; T::BYTE_SIZE];
        value.write_to(&mut bytes);
        *s.bytes.write() = bytes;
        s
    }

    pub fn ttype(&self) -> &TypeRef {
        &self.ty
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    pub fn store_bytes(&self, bytes: Vec<u8>) -> Result<()> {
        if bytes.len() != self.ty.byte_size() {
            return Err(EngineError::InvalidState(format!(
                "scalar store: {} bytes for type {}",
                bytes.len(),
                self.ty.code()
            )));
        }
        *self.bytes.write() = bytes;
        Ok(())
    }

    pub fn get<T: Scalar>(&self) -> Result<T> {
        if self.ty.code() != T::CODE {
            return Err(EngineError::InvalidArgument(format!(
                "scalar is {}, requested {}",
                self.ty.code(),
                T::CODE
            )));
        }
        let bytes = self.bytes.read();
        if bytes.len() != T::BYTE_SIZE {
            return Err(EngineError::InvalidState("scalar is unset".into()));
        }
        Ok(T::read_from(&bytes))
    }
}
