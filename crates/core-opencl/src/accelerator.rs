//! Device discovery and per-engine accelerator state.

use ocl::enums::{DeviceInfo, DeviceInfoResult};
use ocl::{Context, Device, Platform, Queue};
use tracing::info;

use core_program::ProgramCache;
use core_types::Result;

use crate::alloc::{ClAllocGeneral, ClAllocScratch};
use crate::compiler::{map_cl_err, OclCompiler};

/// One OpenCL device with its context, in-order queue, program cache, and
/// general allocator. Owned by the engine; shared by reference with every
/// dispatch context of the accelerated backend.
pub struct ClAccelerator {
    device: Device,
    queue: Queue,
    cache: ProgramCache<OclCompiler>,
    general: ClAllocGeneral,
    max_wgs: usize,
    local_mem_bytes: usize,
}

impl ClAccelerator {
    /// Probe the default platform for a usable device. `Ok(None)` means no
    /// acceleration is available; errors are reserved for a device that
    /// exists but fails to initialize.
    pub fn discover() -> Result<Option<ClAccelerator>> {
        let platform = Platform::default();
        let device = match Device::first(platform) {
            Ok(device) => device,
            Err(_) => return Ok(None),
        };
        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(map_cl_err)?;
        let queue = Queue::new(&context, device, None).map_err(map_cl_err)?;

        let max_wgs = device.max_wg_size().map_err(map_cl_err)?;
        let local_mem_bytes = match device.info(DeviceInfo::LocalMemSize) {
            Ok(DeviceInfoResult::LocalMemSize(bytes)) => bytes as usize,
            _ => 32 * 1024,
        };
        let align_bytes = match device.info(DeviceInfo::MemBaseAddrAlign) {
            Ok(DeviceInfoResult::MemBaseAddrAlign(bits)) => (bits as usize) / 8,
            _ => 512,
        };

        info!(
            target: "accel",
            device = %device.name().map_err(map_cl_err)?,
            max_wgs,
            local_mem_bytes,
            "opencl device initialized"
        );

        let compiler = OclCompiler::new(context, device, queue.clone());
        let general = ClAllocGeneral::new(queue.clone(), align_bytes);
        Ok(Some(ClAccelerator {
            device,
            queue,
            cache: ProgramCache::new(compiler),
            general,
            max_wgs,
            local_mem_bytes,
        }))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn cache(&self) -> &ProgramCache<OclCompiler> {
        &self.cache
    }

    pub fn general(&self) -> &ClAllocGeneral {
        &self.general
    }

    /// Fresh per-task scratch arena.
    pub fn scratch(&self) -> ClAllocScratch {
        ClAllocScratch::new(self.general.clone())
    }

    pub fn max_wgs(&self) -> usize {
        self.max_wgs
    }

    pub fn local_mem_bytes(&self) -> usize {
        self.local_mem_bytes
    }

    /// Drain the command stream (end-of-step barrier).
    pub fn finish(&self) -> Result<()> {
        self.queue.finish().map_err(map_cl_err)
    }
}
