//! OpenCL implementation of the program compiler seam.

use ocl::{Context, Device, Program, Queue};
use tracing::debug;

use core_program::{Compiler, Program as ProgramEntry};
use core_types::{EngineError, Result};

pub fn map_cl_err(err: ocl::Error) -> EngineError {
    EngineError::Generic(err.to_string())
}

/// Compiled program plus the queue kernels will enqueue on.
pub struct OclProgram {
    program: Program,
    queue: Queue,
}

/// Kernel handle: entry name resolved lazily when arguments are bound.
pub struct OclKernel {
    pub program: Program,
    pub queue: Queue,
    pub entry: String,
}

impl OclKernel {
    /// Start an `ocl` kernel builder for this entry point.
    pub fn builder(&self) -> ocl::builders::KernelBuilder<'_> {
        let mut kb = ocl::Kernel::builder();
        kb.program(&self.program)
            .name(&self.entry)
            .queue(self.queue.clone());
        kb
    }
}

impl ProgramEntry for OclProgram {
    type Kernel = OclKernel;

    fn make_kernel(&self, entry: &str) -> Result<OclKernel> {
        Ok(OclKernel {
            program: self.program.clone(),
            queue: self.queue.clone(),
            entry: entry.to_string(),
        })
    }
}

pub struct OclCompiler {
    context: Context,
    device: Device,
    queue: Queue,
}

impl OclCompiler {
    pub fn new(context: Context, device: Device, queue: Queue) -> Self {
        Self {
            context,
            device,
            queue,
        }
    }
}

impl Compiler for OclCompiler {
    type Prog = OclProgram;

    fn compile(&self, name: &str, source: &str) -> Result<OclProgram> {
        debug!(target: "program.cl", name, bytes = source.len(), "compile");
        let program = Program::builder()
            .devices(self.device)
            .src(source)
            .build(&self.context)
            // The `ocl` error Display carries the full build log.
            .map_err(|err| EngineError::CompilationError(format!("{name}: {err}")))?;
        Ok(OclProgram {
            program,
            queue: self.queue.clone(),
        })
    }
}
