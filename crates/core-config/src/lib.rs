//! Engine configuration loading and parsing.
//!
//! Parses `sparx.toml` (or an override path provided by the embedder)
//! extracting backend preference and compute tuning. Values are clamped
//! against the executing context in `Config::apply_context`: block sizes
//! round down to a power of two and never exceed the backend's group-size
//! cap, and the bitonic sort cutoff never exceeds what the backend's local
//! memory can hold. The raw parsed values are retained so a later context
//! change (another device, another queue) can re-clamp.
//!
//! Unknown fields are ignored (TOML deserialization tolerance) to allow
//! forward evolution without immediate warnings; a missing or malformed
//! file falls back to defaults.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

/// Execution-context limits the effective values are clamped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    /// Largest work-group / block the backend supports.
    pub max_block_size: u32,
    /// Local (shared) memory available to one block, in bytes.
    pub local_mem_bytes: u32,
    /// Bytes per sorted element pair (key + widest value).
    pub pair_size: u32,
}

impl ConfigContext {
    pub const fn new(max_block_size: u32, local_mem_bytes: u32, pair_size: u32) -> Self {
        Self {
            max_block_size,
            local_mem_bytes,
            pair_size,
        }
    }

    /// Host-side context: no hard group cap, generous scratch.
    pub fn host() -> Self {
        Self::new(1 << 16, 1 << 20, 8)
    }

    fn bitonic_cap(&self) -> u32 {
        floor_to_pow2(self.local_mem_bytes / self.pair_size.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Use the accelerator when present, host otherwise.
    #[default]
    Auto,
    /// Host backend only, even when an accelerator is present.
    Cpu,
    /// Accelerator required; engine init fails without one.
    Opencl,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct BackendConfig {
    #[serde(default)]
    pub prefer: BackendPreference,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComputeConfig {
    #[serde(default = "ComputeConfig::default_block_size")]
    pub block_size: u32,
    #[serde(default = "ComputeConfig::default_bitonic_max")]
    pub bitonic_max: u32,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            block_size: Self::default_block_size(),
            bitonic_max: Self::default_bitonic_max(),
        }
    }
}

impl ComputeConfig {
    const fn default_block_size() -> u32 {
        1024
    }
    const fn default_bitonic_max() -> u32 {
        1 << 15
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub effective_block_size: u32,
    pub effective_bitonic_max: u32,
}

fn floor_to_pow2(v: u32) -> u32 {
    if v == 0 {
        0
    } else {
        1 << (31 - v.leading_zeros())
    }
}

/// Best-effort config path following platform conventions (XDG / AppData
/// Roaming): prefer a local working-directory `sparx.toml` before falling
/// back to the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("sparx.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("sparx").join("sparx.toml");
    }
    // Final fallback relative filename.
    PathBuf::from("sparx.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(Config {
                raw: Some(content),
                file,
                effective_block_size: 0, // computed later
                effective_bitonic_max: 0,
            }),
            Err(_e) => {
                // On parse error fall back to defaults rather than refusing
                // to start the engine.
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Apply backend context to compute the clamped effective values.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> (u32, u32) {
        let raw_block = self.file.compute.block_size;
        let raw_bitonic = self.file.compute.bitonic_max;

        let block = floor_to_pow2(raw_block.clamp(2, ctx.max_block_size));
        let bitonic = raw_bitonic.min(ctx.bitonic_cap());

        if block != raw_block || bitonic != raw_bitonic {
            info!(
                target: "config",
                raw_block,
                block,
                raw_bitonic,
                bitonic,
                max_block_size = ctx.max_block_size,
                local_mem_bytes = ctx.local_mem_bytes,
                "compute_limits_clamped"
            );
        }
        self.effective_block_size = block;
        self.effective_bitonic_max = bitonic;
        (block, bitonic)
    }

    /// Recompute effective values on a context change (another device or
    /// queue). Returns `Some` when either effective value changed.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<(u32, u32)> {
        let prev = (self.effective_block_size, self.effective_bitonic_max);
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }
}
