//! Template specialization builder.

use std::collections::BTreeSet;

use tracing::trace;

use core_types::{EngineError, Op, Result, TypeRef};

use crate::cache::{Compiler, ProgramCache};
use std::sync::Arc;

/// Assembles a specialized kernel source from a template plus descriptor
/// bindings, then acquires the compiled artifact through the cache.
///
/// Substitution is ordered and purely textual: defines first, then type
/// aliases (each expands to a `typedef` plus an element-size macro), then
/// operators (each expands to an inline function named after its binding).
/// The expansion is prepended as a header; the template text follows
/// unchanged.
pub struct ProgramBuilder<'a, C: Compiler> {
    cache: &'a ProgramCache<C>,
    name: String,
    defines: Vec<(String, i64)>,
    types: Vec<(String, TypeRef)>,
    ops: Vec<(String, Op)>,
    source: Option<&'a str>,
}

impl<'a, C: Compiler> ProgramBuilder<'a, C> {
    pub fn new(cache: &'a ProgramCache<C>) -> Self {
        Self {
            cache,
            name: String::new(),
            defines: Vec::new(),
            types: Vec::new(),
            ops: Vec::new(),
            source: None,
        }
    }

    pub fn set_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn add_define(mut self, define: &str, value: i64) -> Self {
        self.defines.push((define.to_string(), value));
        self
    }

    pub fn add_type(mut self, alias: &str, ty: &TypeRef) -> Self {
        self.types.push((alias.to_string(), ty.clone()));
        self
    }

    pub fn add_op(mut self, name: &str, op: impl Into<Op>) -> Self {
        self.ops.push((name.to_string(), op.into()));
        self
    }

    pub fn set_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    /// Compute the cache key, expand the template, and fetch or compile the
    /// artifact.
    pub fn acquire(self) -> Result<Arc<C::Prog>> {
        let source = self.source.ok_or_else(|| {
            EngineError::InvalidState(format!("unknown template `{}`: no source set", self.name))
        })?;
        self.check_duplicate_bindings()?;
        self.check_op_tokens(source)?;

        let key = self.cache_key();
        let expanded = self.expand(source);
        trace!(target: "program.cache", key = %key, template = %self.name, "acquire");
        self.cache.acquire(&key, &self.name, &expanded)
    }

    fn check_duplicate_bindings(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let names = self
            .defines
            .iter()
            .map(|(n, _)| n)
            .chain(self.types.iter().map(|(n, _)| n))
            .chain(self.ops.iter().map(|(n, _)| n));
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(EngineError::InvalidArgument(format!(
                    "duplicate alias `{name}` in template `{}`",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Every `OP_*` token the template references must have a binding; a
    /// miss here is a caller bug caught before the compiler sees the text.
    fn check_op_tokens(&self, source: &str) -> Result<()> {
        for token in referenced_op_tokens(source) {
            if !self.ops.iter().any(|(name, _)| *name == token) {
                return Err(EngineError::InvalidArgument(format!(
                    "template `{}` references `{token}` with no binding",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn cache_key(&self) -> String {
        let mut defines: Vec<String> = self
            .defines
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        defines.sort_unstable();
        let mut types: Vec<String> = self
            .types
            .iter()
            .map(|(alias, ty)| format!("{alias}:{}", ty.code()))
            .collect();
        types.sort_unstable();
        let mut ops: Vec<String> = self
            .ops
            .iter()
            .map(|(name, op)| format!("{name}:{}", op.key()))
            .collect();
        ops.sort_unstable();
        format!(
            "{}|{}|{}|{}",
            self.name,
            defines.join(","),
            types.join(","),
            ops.join(",")
        )
    }

    fn expand(&self, source: &str) -> String {
        let mut header = String::new();
        for (name, value) in &self.defines {
            header.push_str(&format!("#define {name} {value}\n"));
        }
        for (alias, ty) in &self.types {
            header.push_str(&format!("typedef {} {alias};\n", ty.cl_decl()));
            header.push_str(&format!("#define {alias}_SIZE {}\n", ty.byte_size()));
        }
        for (name, op) in &self.ops {
            header.push_str(&wrap_op(name, op));
        }
        header.push_str(source);
        header
    }
}

fn wrap_op(name: &str, op: &Op) -> String {
    match op {
        Op::Unary(op) => format!(
            "static inline void {name}(__global const void* vp_a, __global void* vp_c) {{ {} }}\n",
            op.source()
        ),
        Op::Binary(op) => format!(
            "static inline void {name}(__global const void* vp_a, __global const void* vp_b, __global void* vp_c) {{ {} }}\n",
            op.source()
        ),
        Op::Select(op) => format!(
            "static inline bool {name}(__global const void* vp_a) {{ {} }}\n",
            op.source()
        ),
    }
}

fn is_ident(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Scan a template for `OP_*` identifier tokens.
fn referenced_op_tokens(source: &str) -> BTreeSet<String> {
    let bytes = source.as_bytes();
    let mut tokens = BTreeSet::new();
    let mut i = 0;
    while let Some(at) = source[i..].find("OP_") {
        let start = i + at;
        let boundary = start == 0 || !is_ident(bytes[start - 1]);
        let mut end = start + 3;
        while end < bytes.len() && is_ident(bytes[end]) {
            end += 1;
        }
        if boundary && end > start + 3 {
            tokens.insert(source[start..end].to_string());
        }
        i = end;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::mock::MockCompiler;
    use core_types::functions::{MULT_INT, PLUS_INT};
    use core_types::INT;

    const TEMPLATE: &str = "__kernel void transform(__global const uint* x) {\n\
                            \x20 TYPE v; OP_MULT(&v, &v, &v);\n\
                            }\n";

    fn cache() -> ProgramCache<MockCompiler> {
        ProgramCache::new(MockCompiler::new())
    }

    #[test]
    fn expansion_header_order_and_shape() {
        let cache = cache();
        ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_define("BLOCK_SIZE", 256)
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        let compiled = cache.compiler().compiled.lock().unwrap();
        let (_, source) = &compiled[0];
        let define_at = source.find("#define BLOCK_SIZE 256").unwrap();
        let typedef_at = source.find("typedef int TYPE;").unwrap();
        let size_at = source.find("#define TYPE_SIZE 4").unwrap();
        let op_at = source.find("static inline void OP_MULT(").unwrap();
        let body_at = source.find("__kernel void transform").unwrap();
        assert!(define_at < typedef_at && typedef_at < size_at && size_at < op_at);
        assert!(op_at < body_at);
    }

    #[test]
    fn equal_tuples_share_one_artifact() {
        let cache = cache();
        let a = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_define("BLOCK_SIZE", 256)
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        let b = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_define("BLOCK_SIZE", 256)
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.compiler().compile_count(), 1);
    }

    #[test]
    fn changing_a_define_invalidates_reuse() {
        let cache = cache();
        let a = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_define("BLOCK_SIZE", 256)
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        let b = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_define("BLOCK_SIZE", 512)
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.compiler().compile_count(), 2);
    }

    #[test]
    fn op_keys_distinguish_identical_bodies() {
        // PLUS_INT and MULT_INT could have byte-identical bodies in a user
        // catalog; the key tuple, not the text, must separate them.
        let cache = cache();
        let a = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", PLUS_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        let b = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn missing_source_is_unknown_template() {
        let cache = cache();
        let err = ProgramBuilder::new(&cache)
            .set_name("ghost")
            .acquire()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn duplicate_alias_rejected() {
        let cache = cache();
        let err = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_type("TYPE", &INT)
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate alias"));
    }

    #[test]
    fn unbound_op_token_rejected() {
        let cache = cache();
        let err = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_type("TYPE", &INT)
            .set_source(TEMPLATE)
            .acquire()
            .unwrap_err();
        assert!(err.to_string().contains("OP_MULT"));
    }

    #[test]
    fn make_kernel_resolves_entry_points() {
        let cache = cache();
        let program = ProgramBuilder::new(&cache)
            .set_name("transform")
            .add_type("TYPE", &INT)
            .add_op("OP_MULT", MULT_INT.clone())
            .set_source(TEMPLATE)
            .acquire()
            .unwrap();
        use crate::cache::Program as _;
        assert_eq!(program.make_kernel("transform").unwrap(), "transform");
        assert!(program.make_kernel("missing").is_err());
    }
}
