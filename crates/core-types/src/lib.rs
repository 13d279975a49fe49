//! Element type and operator descriptors plus the engine error taxonomy.
//!
//! Everything here is immutable after construction and shared by reference
//! (`Arc`). Descriptors are leaves: they carry a unique key fragment used for
//! algorithm/cache key synthesis, an element byte width (types), a textual
//! OpenCL snippet (for runtime kernel specialization), and a host closure
//! (for the CPU backend). The rest of the engine never inspects element
//! values directly; storage is raw bytes and the closures are the only code
//! that interprets them.

mod error;
mod ops;
mod scalar;
mod ttype;

pub mod functions;

pub use error::{EngineError, Result};
pub use ops::{Op, OpBinary, OpBinaryRef, OpSelect, OpSelectRef, OpUnary, OpUnaryRef};
pub use scalar::Scalar;
pub use ttype::{Type, TypeRef, DOUBLE, FLOAT, INT, UINT, VOID};
