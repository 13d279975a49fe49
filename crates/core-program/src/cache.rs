//! Compiler seam and the process-wide program cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use core_types::{EngineError, Result};

/// A compiled program exposing named entry points.
pub trait Program: Send + Sync {
    type Kernel;

    /// Instantiate the entry point `entry`.
    fn make_kernel(&self, entry: &str) -> Result<Self::Kernel>;
}

/// Backend that turns specialized source text into a [`Program`].
///
/// The production implementation submits to the accelerator runtime; tests
/// use a recording mock. Compile failures must surface the build log in the
/// error payload.
pub trait Compiler: Send + Sync {
    type Prog: Program;

    fn compile(&self, name: &str, source: &str) -> Result<Self::Prog>;
}

/// Cache slot: a shared artifact or the remembered failure.
pub type CompiledArtifact<P> = std::result::Result<Arc<P>, EngineError>;

/// Process-wide cache of compiled programs keyed by the exact descriptor
/// tuple `(template name, sorted defines, sorted type keys, sorted op keys)`.
pub struct ProgramCache<C: Compiler> {
    compiler: C,
    entries: DashMap<String, CompiledArtifact<C::Prog>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl<C: Compiler> ProgramCache<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `key`, compiling `source` on a miss. Idempotent on success:
    /// equal key tuples share one artifact. A failed compile is cached and
    /// replayed to every later caller of the same key.
    pub fn acquire(&self, key: &str, name: &str, source: &str) -> CompiledArtifact<C::Prog> {
        if let Some(entry) = self.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let outcome = match self.compiler.compile(name, source) {
            Ok(program) => {
                debug!(target: "program.cache", key, "compiled");
                Ok(Arc::new(program))
            }
            Err(err) => {
                warn!(target: "program.cache", key, %err, "compile failed; caching negative result");
                Err(err)
            }
        };
        // First writer wins under a racing miss so callers always observe
        // one artifact per key.
        self.entries
            .entry(key.to_string())
            .or_insert(outcome)
            .clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn metrics_snapshot(&self) -> ProgramCacheMetricsSnapshot {
        ProgramCacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
