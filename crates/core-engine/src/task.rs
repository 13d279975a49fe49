//! Normalized schedule tasks.
//!
//! A task names one operation, references its operand handles and operator
//! descriptors, and carries descriptor flags (mask complement). Tasks are
//! immutable once built; the dispatcher derives the registry key from the
//! task contents alone so a task always selects the algorithm matching its
//! operand types and operators.

use std::fmt;
use std::sync::Arc;

use core_storage::{MatrixRef, ScalarValRef, VectorRef};
use core_types::{OpBinaryRef, OpUnaryRef, Result};

use crate::registry::{Backend, KeyBuilder};

pub type CallbackFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

pub enum Task {
    /// Host callback executed at its position in the schedule.
    Callback { f: CallbackFn },
    /// `w[i] = op(a[i])` over the sparsity pattern of `a`.
    VMap {
        w: VectorRef,
        a: VectorRef,
        op: OpUnaryRef,
    },
    /// `s = fold(op, init, a)` over stored values of `a`.
    VReduce {
        s: ScalarValRef,
        init: ScalarValRef,
        a: VectorRef,
        op: OpBinaryRef,
    },
    /// Element-wise union `w = a (+) b`; `op` combines collisions.
    VEadd {
        w: VectorRef,
        a: VectorRef,
        b: VectorRef,
        op: OpBinaryRef,
    },
    /// Assign `value` at mask-selected positions of `w`.
    VAssignMasked {
        w: VectorRef,
        mask: VectorRef,
        value: ScalarValRef,
        complement: bool,
    },
    /// Masked sparse vector-matrix product over an (add, mult) semiring.
    /// Pattern-only operands carry no operators.
    VxmMasked {
        w: VectorRef,
        a: VectorRef,
        b: MatrixRef,
        add: Option<OpBinaryRef>,
        mult: Option<OpBinaryRef>,
        mask: Option<VectorRef>,
        complement: bool,
    },
    /// Masked matrix-vector product over an (add, mult) semiring.
    MxvMasked {
        w: VectorRef,
        m: MatrixRef,
        v: VectorRef,
        add: OpBinaryRef,
        mult: OpBinaryRef,
        mask: Option<VectorRef>,
        complement: bool,
    },
    /// `s = fold(op, init, m)` over all stored matrix values.
    MReduce {
        s: ScalarValRef,
        init: ScalarValRef,
        m: MatrixRef,
        op: OpBinaryRef,
    },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Callback { .. } => "callback",
            Task::VMap { .. } => "v_map",
            Task::VReduce { .. } => "v_reduce",
            Task::VEadd { .. } => "v_eadd",
            Task::VAssignMasked { .. } => "v_assign_masked",
            Task::VxmMasked { .. } => "vxm_masked",
            Task::MxvMasked { .. } => "mxv_masked",
            Task::MReduce { .. } => "m_reduce",
        }
    }

    /// Registry key for this task on `backend`: operation name, operator
    /// keys in declaration order, type codes in declaration order, suffix.
    pub fn build_key(&self, backend: Backend) -> String {
        let kb = KeyBuilder::new(self.name());
        match self {
            Task::Callback { .. } => kb.backend(backend),
            Task::VMap { a, .. } => kb.type_key(a.ttype()).backend(backend),
            Task::VReduce { a, .. } => kb.type_key(a.ttype()).backend(backend),
            Task::VEadd { a, .. } => kb.type_key(a.ttype()).backend(backend),
            Task::VAssignMasked { w, .. } => kb.type_key(w.ttype()).backend(backend),
            Task::VxmMasked { add, mult, .. } => match (add, mult) {
                (Some(add), Some(mult)) => kb
                    .op_key(add.key())
                    .op_key(mult.key())
                    .backend(backend),
                // Pattern-only products reference no operators.
                _ => kb.backend(backend),
            },
            Task::MxvMasked { add, mult, .. } => kb
                .op_key(add.key())
                .op_key(mult.key())
                .backend(backend),
            Task::MReduce { m, .. } => kb.type_key(m.ttype()).backend(backend),
        }
    }

    /// Identity of every handle this task writes, for overlap detection
    /// within a step.
    pub fn output_ids(&self) -> Vec<usize> {
        match self {
            Task::Callback { .. } => Vec::new(),
            Task::VMap { w, .. } => vec![Arc::as_ptr(w) as usize],
            Task::VReduce { s, .. } => vec![Arc::as_ptr(s) as usize],
            Task::VEadd { w, .. } => vec![Arc::as_ptr(w) as usize],
            Task::VAssignMasked { w, .. } => vec![Arc::as_ptr(w) as usize],
            Task::VxmMasked { w, .. } => vec![Arc::as_ptr(w) as usize],
            Task::MxvMasked { w, .. } => vec![Arc::as_ptr(w) as usize],
            Task::MReduce { s, .. } => vec![Arc::as_ptr(s) as usize],
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name()).finish()
    }
}
