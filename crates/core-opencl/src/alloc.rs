//! Device buffer allocators.
//!
//! The general allocator serves long-lived buffers and paired allocations
//! (two buffers carved from one region, so streams that always travel
//! together stay adjacent). The scratch allocator is a bump arena for
//! per-task working buffers; `reset` recycles the arena at task end, and
//! scratch buffers must not escape the task that allocated them.

use std::cell::RefCell;

use ocl::{Buffer, Queue};

use core_types::{EngineError, Result};

fn oom(err: ocl::Error) -> EngineError {
    EngineError::OutOfMemory(format!("device alloc: {err}"))
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

#[derive(Clone)]
pub struct ClAllocGeneral {
    queue: Queue,
    /// Sub-buffer origin alignment in bytes (device base-address align).
    align: usize,
}

impl ClAllocGeneral {
    pub fn new(queue: Queue, align: usize) -> Self {
        Self {
            queue,
            align: align.max(1),
        }
    }

    pub fn alloc(&self, len: usize) -> Result<Buffer<u8>> {
        Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .len(len.max(1))
            .build()
            .map_err(oom)
    }

    /// Two buffers from a single underlying region; the second starts at
    /// the first aligned offset past `len_a`.
    pub fn alloc_paired(&self, len_a: usize, len_b: usize) -> Result<(Buffer<u8>, Buffer<u8>)> {
        let a_span = align_up(len_a.max(1), self.align);
        let region = self.alloc(a_span + len_b.max(1))?;
        let a = region
            .create_sub_buffer(None, 0, len_a.max(1))
            .map_err(oom)?;
        let b = region
            .create_sub_buffer(None, a_span, len_b.max(1))
            .map_err(oom)?;
        Ok((a, b))
    }
}

const SCRATCH_CHUNK: usize = 4 << 20;

/// Per-task bump allocator over device memory.
pub struct ClAllocScratch {
    general: ClAllocGeneral,
    chunks: RefCell<Vec<(Buffer<u8>, usize)>>,
}

impl ClAllocScratch {
    pub fn new(general: ClAllocGeneral) -> Self {
        Self {
            general,
            chunks: RefCell::new(Vec::new()),
        }
    }

    pub fn alloc(&self, len: usize) -> Result<Buffer<u8>> {
        let len = len.max(1);
        let align = self.general.align;
        let mut chunks = self.chunks.borrow_mut();
        if let Some((chunk, used)) = chunks.last_mut() {
            let at = align_up(*used, align);
            if at + len <= chunk.len() {
                let sub = chunk.create_sub_buffer(None, at, len).map_err(oom)?;
                *used = at + len;
                return Ok(sub);
            }
        }
        let chunk = self.general.alloc(SCRATCH_CHUNK.max(len))?;
        let sub = chunk.create_sub_buffer(None, 0, len).map_err(oom)?;
        chunks.push((chunk, len));
        Ok(sub)
    }

    /// Recycle the arena. Only valid once every sub-buffer handed out this
    /// task has been dropped.
    pub fn reset(&self) {
        let mut chunks = self.chunks.borrow_mut();
        // Keep the largest chunk warm for the next task.
        chunks.sort_by_key(|(chunk, _)| chunk.len());
        chunks.truncate(1);
        if let Some((_, used)) = chunks.last_mut() {
            *used = 0;
        }
    }
}
