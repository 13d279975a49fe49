//! High-level sparse algorithms and their registration.
//!
//! Every algorithm is one stateless object registered under each key it
//! serves; values are byte streams, so one instance covers all element
//! types and the key only fixes which descriptors the task must carry.
//! Registration happens once at engine init, before any schedule may be
//! submitted.

mod callback;
mod m_reduce;
mod mxv;
mod v_assign;
mod v_eadd;
mod v_map;
mod v_reduce;
mod vxm;

#[cfg(feature = "opencl")]
mod vxm_cl;

use std::borrow::Cow;
use std::sync::Arc;

use core_compute::indices_to_row_offsets;
use core_storage::MatrixStorage;
use core_types::functions as fns;
use core_types::{EngineError, OpBinaryRef, Result, TypeRef, DOUBLE, FLOAT, INT, UINT};

use crate::registry::{Backend, KeyBuilder, Registry, RegistryAlgo};

pub use callback::AlgoCallbackCpu;
pub use m_reduce::AlgoMReduceCpu;
pub use mxv::AlgoMxvCpu;
pub use v_assign::AlgoVAssignMaskedCpu;
pub use v_eadd::AlgoVEaddCpu;
pub use v_map::AlgoVMapCpu;
pub use v_reduce::AlgoVReduceCpu;
pub use vxm::AlgoVxmCpu;

#[cfg(feature = "opencl")]
pub use vxm_cl::AlgoVxmCl;

/// Uniform row-major view of a matrix block: CSR exposes its arrays, COO
/// derives offsets from its sorted row indices.
pub(crate) struct MatrixRowsView<'a> {
    pub offsets: Cow<'a, [u32]>,
    pub lengths: Vec<u32>,
    pub cols: &'a [u32],
    pub vals: &'a [u8],
}

pub(crate) fn matrix_rows_view<'a>(
    storage: &'a MatrixStorage,
    n_rows: usize,
) -> Result<MatrixRowsView<'a>> {
    match storage {
        MatrixStorage::Empty => Err(EngineError::InvalidState(
            "matrix operand has no storage".into(),
        )),
        MatrixStorage::Coo(block) => {
            let (offsets, lengths) = indices_to_row_offsets(&block.rows, n_rows);
            Ok(MatrixRowsView {
                offsets: Cow::Owned(offsets),
                lengths,
                cols: &block.cols,
                vals: &block.vals,
            })
        }
        MatrixStorage::Csr(block) => {
            let lengths = block
                .offsets
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .collect();
            Ok(MatrixRowsView {
                offsets: Cow::Borrowed(&block.offsets),
                lengths,
                cols: &block.cols,
                vals: &block.vals,
            })
        }
    }
}

/// Dispatch-time type agreement: the operand's element type must equal the
/// type the selected key was built from.
pub(crate) fn check_type(what: &str, expected: &TypeRef, got: &TypeRef) -> Result<()> {
    if expected.code() != got.code() {
        return Err(EngineError::InvalidArgument(format!(
            "{what}: expected element type {}, got {}",
            expected.code(),
            got.code()
        )));
    }
    Ok(())
}

/// Builtin (add, mult) pairs the product algorithms are registered for.
fn semiring_pairs() -> Vec<(OpBinaryRef, OpBinaryRef)> {
    let families: [(Vec<OpBinaryRef>, Vec<OpBinaryRef>); 4] = [
        (
            vec![fns::PLUS_INT.clone(), fns::MIN_INT.clone(), fns::MAX_INT.clone()],
            vec![
                fns::MULT_INT.clone(),
                fns::PLUS_INT.clone(),
                fns::FIRST_INT.clone(),
                fns::SECOND_INT.clone(),
                fns::ONE_INT.clone(),
            ],
        ),
        (
            vec![fns::PLUS_UINT.clone(), fns::MIN_UINT.clone(), fns::MAX_UINT.clone()],
            vec![
                fns::MULT_UINT.clone(),
                fns::PLUS_UINT.clone(),
                fns::FIRST_UINT.clone(),
                fns::SECOND_UINT.clone(),
                fns::ONE_UINT.clone(),
            ],
        ),
        (
            vec![
                fns::PLUS_FLOAT.clone(),
                fns::MIN_FLOAT.clone(),
                fns::MAX_FLOAT.clone(),
            ],
            vec![
                fns::MULT_FLOAT.clone(),
                fns::PLUS_FLOAT.clone(),
                fns::FIRST_FLOAT.clone(),
                fns::SECOND_FLOAT.clone(),
                fns::ONE_FLOAT.clone(),
            ],
        ),
        (
            vec![
                fns::PLUS_DOUBLE.clone(),
                fns::MIN_DOUBLE.clone(),
                fns::MAX_DOUBLE.clone(),
            ],
            vec![
                fns::MULT_DOUBLE.clone(),
                fns::PLUS_DOUBLE.clone(),
                fns::FIRST_DOUBLE.clone(),
                fns::SECOND_DOUBLE.clone(),
                fns::ONE_DOUBLE.clone(),
            ],
        ),
    ];
    families
        .iter()
        .flat_map(|(adds, mults)| {
            adds.iter().flat_map(move |add| {
                mults
                    .iter()
                    .map(move |mult| (add.clone(), mult.clone()))
            })
        })
        .collect()
}

/// Register every builtin host algorithm. Must complete before the first
/// schedule submission; the registry is read-only afterwards.
pub fn register_cpu(registry: &mut Registry) -> Result<()> {
    registry.add(
        &KeyBuilder::new("callback").backend(Backend::Cpu),
        Arc::new(AlgoCallbackCpu),
    )?;

    let types: [&TypeRef; 4] = [&INT, &UINT, &FLOAT, &DOUBLE];
    for ty in types {
        registry.add(
            &KeyBuilder::new("v_map").type_key(ty).backend(Backend::Cpu),
            Arc::new(AlgoVMapCpu),
        )?;
        registry.add(
            &KeyBuilder::new("v_reduce").type_key(ty).backend(Backend::Cpu),
            Arc::new(AlgoVReduceCpu),
        )?;
        registry.add(
            &KeyBuilder::new("v_eadd").type_key(ty).backend(Backend::Cpu),
            Arc::new(AlgoVEaddCpu),
        )?;
        registry.add(
            &KeyBuilder::new("v_assign_masked")
                .type_key(ty)
                .backend(Backend::Cpu),
            Arc::new(AlgoVAssignMaskedCpu),
        )?;
        registry.add(
            &KeyBuilder::new("m_reduce").type_key(ty).backend(Backend::Cpu),
            Arc::new(AlgoMReduceCpu),
        )?;
    }

    let vxm: Arc<dyn RegistryAlgo> = Arc::new(AlgoVxmCpu);
    let mxv: Arc<dyn RegistryAlgo> = Arc::new(AlgoMxvCpu);
    for (add, mult) in semiring_pairs() {
        registry.add(
            &KeyBuilder::new("vxm_masked")
                .op_key(add.key())
                .op_key(mult.key())
                .backend(Backend::Cpu),
            vxm.clone(),
        )?;
        registry.add(
            &KeyBuilder::new("mxv_masked")
                .op_key(add.key())
                .op_key(mult.key())
                .backend(Backend::Cpu),
            mxv.clone(),
        )?;
    }
    // Pattern-only product: no operator fragments in the key.
    registry.add(&KeyBuilder::new("vxm_masked").backend(Backend::Cpu), vxm)?;

    Ok(())
}

/// Register the accelerated algorithms. Called only when a device is live.
#[cfg(feature = "opencl")]
pub fn register_cl(registry: &mut Registry) -> Result<()> {
    let vxm: Arc<dyn RegistryAlgo> = Arc::new(AlgoVxmCl);
    for (add, mult) in semiring_pairs() {
        registry.add(
            &KeyBuilder::new("vxm_masked")
                .op_key(add.key())
                .op_key(mult.key())
                .backend(Backend::Cl),
            vxm.clone(),
        )?;
    }
    registry.add(&KeyBuilder::new("vxm_masked").backend(Backend::Cl), vxm)?;
    Ok(())
}
