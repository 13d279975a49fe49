//! Kernel template sources.
//!
//! Templates are plain UTF-8 documents with an enumerated token set: the
//! `#define`d constants, type aliases, and `OP_*` entry points the program
//! builder binds at acquire time. They are embedded unconditionally so the
//! token contract stays testable on hosts without an OpenCL runtime.

pub const SCAN: &str = include_str!("scan.cl");
pub const SORT_BITONIC: &str = include_str!("sort_bitonic.cl");
pub const SORT_RADIX: &str = include_str!("sort_radix.cl");
pub const VXM: &str = include_str!("vxm.cl");
pub const VXM_TRANSFORM: &str = include_str!("vxm_transform.cl");
pub const REDUCE_BY_KEY: &str = include_str!("reduce_by_key.cl");
pub const REDUCE_DUPLICATES: &str = include_str!("reduce_duplicates.cl");
pub const APPLY_MASK: &str = include_str!("apply_mask.cl");
