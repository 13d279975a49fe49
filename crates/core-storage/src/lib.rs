//! Sparse operand storage: compressed blocks and shared-ownership handles.
//!
//! Operands (vectors, matrices, scalars) are handles with interior variant
//! storage: algorithms replace the storage under a write-once-per-step
//! discipline while earlier schedule steps may still hold references. The
//! blocks themselves are plain data with explicit invariant checks; nothing
//! here interprets values beyond their byte width.

mod block;
mod handle;

pub use block::{CooMtx, CooVec, CsrMtx};
pub use handle::{Matrix, MatrixRef, MatrixStorage, ScalarVal, ScalarValRef, Vector, VectorRef, VectorStorage};
