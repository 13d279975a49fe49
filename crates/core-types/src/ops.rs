//! Operator descriptors.
//!
//! An operator is a key fragment plus two executable forms: an OpenCL body
//! snippet (substituted into kernel templates by the program builder) and a
//! host closure over raw little-endian bytes (executed by the CPU backend).
//! The byte-level signature keeps storage type-erased; `from_fn` wraps a
//! typed closure so builtins and user operators are written against real
//! scalar types.

use std::fmt;
use std::sync::Arc;

use crate::scalar::Scalar;
use crate::ttype::TypeRef;

pub type UnaryEval = Arc<dyn Fn(&[u8], &mut [u8]) + Send + Sync>;
pub type BinaryEval = Arc<dyn Fn(&[u8], &[u8], &mut [u8]) + Send + Sync>;
pub type SelectEval = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Unary element operator `r = f(a)`.
pub struct OpUnary {
    key: String,
    ta: TypeRef,
    tr: TypeRef,
    source: String,
    eval: UnaryEval,
}

/// Binary element operator `r = f(a, b)`.
pub struct OpBinary {
    key: String,
    ta: TypeRef,
    tb: TypeRef,
    tr: TypeRef,
    source: String,
    eval: BinaryEval,
}

/// Predicate operator `keep = f(a)` used for masks and filters.
pub struct OpSelect {
    key: String,
    ta: TypeRef,
    source: String,
    eval: SelectEval,
}

pub type OpUnaryRef = Arc<OpUnary>;
pub type OpBinaryRef = Arc<OpBinary>;
pub type OpSelectRef = Arc<OpSelect>;

impl OpUnary {
    pub fn new(
        key: impl Into<String>,
        ta: TypeRef,
        tr: TypeRef,
        source: impl Into<String>,
        eval: UnaryEval,
    ) -> OpUnaryRef {
        Arc::new(OpUnary {
            key: key.into(),
            ta,
            tr,
            source: source.into(),
            eval,
        })
    }

    /// Wrap a typed host closure; byte decode/encode handled here once.
    pub fn from_fn<A, R, F>(key: impl Into<String>, source: impl Into<String>, f: F) -> OpUnaryRef
    where
        A: Scalar,
        R: Scalar,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let eval: UnaryEval = Arc::new(move |a, out| f(A::read_from(a)).write_to(out));
        Self::new(key, A::ttype(), R::ttype(), source, eval)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ta(&self) -> &TypeRef {
        &self.ta
    }

    pub fn tr(&self) -> &TypeRef {
        &self.tr
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, a: &[u8], out: &mut [u8]) {
        (self.eval)(a, out)
    }
}

impl OpBinary {
    pub fn new(
        key: impl Into<String>,
        ta: TypeRef,
        tb: TypeRef,
        tr: TypeRef,
        source: impl Into<String>,
        eval: BinaryEval,
    ) -> OpBinaryRef {
        Arc::new(OpBinary {
            key: key.into(),
            ta,
            tb,
            tr,
            source: source.into(),
            eval,
        })
    }

    pub fn from_fn<A, B, R, F>(key: impl Into<String>, source: impl Into<String>, f: F) -> OpBinaryRef
    where
        A: Scalar,
        B: Scalar,
        R: Scalar,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        let eval: BinaryEval =
            Arc::new(move |a, b, out| f(A::read_from(a), B::read_from(b)).write_to(out));
        Self::new(key, A::ttype(), B::ttype(), R::ttype(), source, eval)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ta(&self) -> &TypeRef {
        &self.ta
    }

    pub fn tb(&self) -> &TypeRef {
        &self.tb
    }

    pub fn tr(&self) -> &TypeRef {
        &self.tr
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, a: &[u8], b: &[u8], out: &mut [u8]) {
        (self.eval)(a, b, out)
    }
}

impl OpSelect {
    pub fn new(
        key: impl Into<String>,
        ta: TypeRef,
        source: impl Into<String>,
        eval: SelectEval,
    ) -> OpSelectRef {
        Arc::new(OpSelect {
            key: key.into(),
            ta,
            source: source.into(),
            eval,
        })
    }

    pub fn from_fn<A, F>(key: impl Into<String>, source: impl Into<String>, f: F) -> OpSelectRef
    where
        A: Scalar,
        F: Fn(A) -> bool + Send + Sync + 'static,
    {
        let eval: SelectEval = Arc::new(move |a| f(A::read_from(a)));
        Self::new(key, A::ttype(), source, eval)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ta(&self) -> &TypeRef {
        &self.ta
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, a: &[u8]) -> bool {
        (self.eval)(a)
    }
}

/// Any operator kind, as accepted by the program builder.
#[derive(Clone)]
pub enum Op {
    Unary(OpUnaryRef),
    Binary(OpBinaryRef),
    Select(OpSelectRef),
}

impl Op {
    pub fn key(&self) -> &str {
        match self {
            Op::Unary(op) => op.key(),
            Op::Binary(op) => op.key(),
            Op::Select(op) => op.key(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Op::Unary(op) => op.source(),
            Op::Binary(op) => op.source(),
            Op::Select(op) => op.source(),
        }
    }
}

impl From<OpUnaryRef> for Op {
    fn from(op: OpUnaryRef) -> Self {
        Op::Unary(op)
    }
}

impl From<OpBinaryRef> for Op {
    fn from(op: OpBinaryRef) -> Self {
        Op::Binary(op)
    }
}

impl From<OpSelectRef> for Op {
    fn from(op: OpSelectRef) -> Self {
        Op::Select(op)
    }
}

impl fmt::Debug for OpUnary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpUnary")
            .field("key", &self.key)
            .field("ta", &self.ta.code())
            .field("tr", &self.tr.code())
            .finish()
    }
}

impl fmt::Debug for OpBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpBinary")
            .field("key", &self.key)
            .field("ta", &self.ta.code())
            .field("tb", &self.tb.code())
            .field("tr", &self.tr.code())
            .finish()
    }
}

impl fmt::Debug for OpSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpSelect")
            .field("key", &self.key)
            .field("ta", &self.ta.code())
            .finish()
    }
}
