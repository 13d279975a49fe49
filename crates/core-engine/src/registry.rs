//! Keyed algorithm catalog.
//!
//! Keys follow the grammar `name ("_" (op_key | type_key))* backend` with
//! backend one of `__cpu` / `__cl`, e.g. `v_eadd_INT__cpu` or
//! `vxm_masked_PLUS_FLOAT_MULT_FLOAT__cl`. The registry is populated at
//! engine init and read-only afterwards; `add` on a live key is an error,
//! never a replace.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use core_types::{EngineError, Result, TypeRef};

use crate::dispatch::DispatchContext;

pub const CPU_SUFFIX: &str = "__cpu";
pub const CL_SUFFIX: &str = "__cl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Cl,
}

impl Backend {
    pub fn suffix(self) -> &'static str {
        match self {
            Backend::Cpu => CPU_SUFFIX,
            Backend::Cl => CL_SUFFIX,
        }
    }

    pub fn other(self) -> Backend {
        match self {
            Backend::Cpu => Backend::Cl,
            Backend::Cl => Backend::Cpu,
        }
    }
}

/// Composite key assembly in declaration order: operator fragments, then
/// type fragments, then the backend suffix.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    buf: String,
}

impl KeyBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            buf: name.to_string(),
        }
    }

    pub fn op_key(mut self, key: &str) -> Self {
        self.buf.push('_');
        self.buf.push_str(key);
        self
    }

    pub fn type_key(mut self, ty: &TypeRef) -> Self {
        self.buf.push('_');
        self.buf.push_str(ty.code());
        self
    }

    pub fn backend(mut self, backend: Backend) -> String {
        self.buf.push_str(backend.suffix());
        self.buf
    }
}

/// Algorithm suitable to process a schedule task selected by string key.
pub trait RegistryAlgo: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()>;
}

/// Flat key-to-algorithm map.
#[derive(Default)]
pub struct Registry {
    map: HashMap<String, Arc<dyn RegistryAlgo>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, algo: Arc<dyn RegistryAlgo>) -> Result<()> {
        if self.map.contains_key(key) {
            return Err(EngineError::InvalidState(format!(
                "registry already has key `{key}`"
            )));
        }
        trace!(target: "registry", key, algo = algo.name(), "add");
        self.map.insert(key.to_string(), algo);
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn find(&self, key: &str) -> Option<Arc<dyn RegistryAlgo>> {
        self.map.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
