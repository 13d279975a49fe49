//! Runtime kernel program synthesis and caching.
//!
//! A kernel template is a UTF-8 document with an enumerated token set:
//! `#define`d constants, type aliases (`TYPE`, caller-named), and operator
//! entry points (`OP_*`). The builder binds descriptors to those tokens,
//! prepends the expansion header, and hands the specialized source to a
//! [`Compiler`]. Compiled artifacts are cached process-wide on the exact
//! descriptor-key tuple — never on the expanded text, which would collide
//! for semantically distinct operators with identical bodies. Failed
//! compiles are cached negatively so every task needing the same broken
//! specialization fails fast with the original build log.

mod builder;
mod cache;

pub use builder::ProgramBuilder;
pub use cache::{CompiledArtifact, Compiler, Program, ProgramCache, ProgramCacheMetricsSnapshot};
