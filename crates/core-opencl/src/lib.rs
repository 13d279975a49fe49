//! Accelerated backend over the OpenCL runtime.
//!
//! The kernel templates are always present; the runtime half (device
//! discovery, allocators, compiler, primitive wrappers) only exists behind
//! the `opencl` feature so host-only builds never link the OpenCL library.
//! Device buffers are untyped byte ranges, matching the byte-oriented value
//! storage on the host side; kernels impose their own element views.

pub mod kernels;

#[cfg(feature = "opencl")]
pub use ocl;

#[cfg(feature = "opencl")]
mod accelerator;
#[cfg(feature = "opencl")]
mod alloc;
#[cfg(feature = "opencl")]
mod compiler;
#[cfg(feature = "opencl")]
mod scan;
#[cfg(feature = "opencl")]
mod sort;

#[cfg(feature = "opencl")]
pub use accelerator::ClAccelerator;
#[cfg(feature = "opencl")]
pub use alloc::{ClAllocGeneral, ClAllocScratch};
#[cfg(feature = "opencl")]
pub use compiler::{map_cl_err, OclCompiler, OclProgram};
#[cfg(feature = "opencl")]
pub use scan::cl_exclusive_scan;
#[cfg(feature = "opencl")]
pub use sort::{cl_sort_by_key, cl_sort_by_key_bitonic, cl_sort_by_key_radix};
