//! Configuration system for the pipeline simulator.
//!
//! This module defines all configuration structures used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline hardware constants (memory size and latency, cache geometry, widths).
//! 2. **Structures:** Hierarchical config for general, system, memory, cache, and pipeline.
//! 3. **Variants:** Presets reproducing the machine generations (scalar through multi-core).
//!
//! Configuration is supplied via JSON (`Config::from_json`) or built from a preset
//! with `Config::for_variant`. `Config::default()` is the scalar machine.

use serde::{Deserialize, Serialize};

use crate::common::constants::DEFAULT_MAX_CYCLES;
use crate::common::error::{SimError, SimResult};

/// Default configuration constants for the simulator.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden in a JSON configuration.
mod defaults {
    /// Size of main memory (64 KiB).
    pub const MEMORY_SIZE: usize = 64 * 1024;

    /// Main memory access latency in cycles.
    ///
    /// Applies to instruction fetch misses, uncached data accesses and
    /// line fills that miss every cache level.
    pub const MEMORY_LATENCY: u64 = 50;

    /// Default cache capacity in lines.
    pub const CACHE_LINES: usize = 64;

    /// Default cache line size in bytes.
    pub const CACHE_LINE: usize = 16;

    /// Default private cache hit latency in cycles.
    pub const CACHE_LATENCY: u64 = 1;

    /// Default shared outer cache capacity in lines.
    pub const SHARED_LINES: usize = 256;

    /// Default shared outer cache hit latency in cycles.
    pub const SHARED_LATENCY: u64 = 10;

    /// Default pipeline width (1 instruction per cycle per stage).
    pub const PIPELINE_WIDTH: usize = 1;

    /// Default pending (stalled) instruction queue capacity.
    pub const PENDING_QUEUE: usize = 8;

    /// Default Branch Target Buffer size (16 entries).
    pub const BTB_SIZE: usize = 16;

    /// Default number of physical rename slots.
    pub const PHYSICAL_REGISTERS: usize = 32;
}

/// Machine generation presets.
///
/// Each preset enables one more microarchitectural feature than the one
/// before it. Every preset must produce the same architectural state for the
/// same program; only cycle counts differ.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// One instruction in flight at a time.
    #[default]
    Scalar,
    /// Overlapped stages, one instruction per stage.
    Pipelined,
    /// Pipelined with instruction, data and shared caches.
    Cached,
    /// Cached with a branch target buffer and fall-through speculation.
    Predicted,
    /// Multi-issue with forwarding and register renaming.
    Superscalar,
    /// Superscalar cores sharing memory through the MSI directory.
    MultiCore,
}

impl Variant {
    /// Every preset, in upgrade order.
    pub const ALL: [Self; 6] = [
        Self::Scalar,
        Self::Pipelined,
        Self::Cached,
        Self::Predicted,
        Self::Superscalar,
        Self::MultiCore,
    ];

    /// Returns the preset's command-line name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Pipelined => "pipelined",
            Self::Cached => "cached",
            Self::Predicted => "predicted",
            Self::Superscalar => "superscalar",
            Self::MultiCore => "multi-core",
        }
    }

    /// Parses a preset name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use pipesim_core::config::Config;
///
/// let config = Config::default();
/// assert!(!config.pipeline.pipelined);
/// assert_eq!(config.system.cores, 1);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use pipesim_core::config::Config;
///
/// let json = r#"{
///     "system": { "cores": 2 },
///     "cache": {
///         "l1_d": { "enabled": true, "lines": 8, "line_bytes": 16 }
///     },
///     "pipeline": { "pipelined": true, "width": 2, "forwarding": true }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.system.cores, 2);
/// assert_eq!(config.cache.l1_d.lines, 8);
/// assert_eq!(config.memory.latency, 50);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// General simulation settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Core count
    #[serde(default)]
    pub system: SystemConfig,
    /// Main memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Cache hierarchy configuration
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
    /// Pipeline, issue policy and branch predictor configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// Missing sections and fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the preset configuration for a machine generation.
    pub fn for_variant(variant: Variant) -> Self {
        let mut config = Self::default();
        let p = &mut config.pipeline;
        let c = &mut config.cache;
        if variant >= Variant::Pipelined {
            p.pipelined = true;
        }
        if variant >= Variant::Cached {
            c.l1_i.enabled = true;
            c.l1_d.enabled = true;
            c.shared.enabled = true;
        }
        if variant >= Variant::Predicted {
            p.branch_prediction = true;
        }
        if variant >= Variant::Superscalar {
            p.width = 4;
            p.execute_units = 4;
            p.writeback_units = 2;
            p.pending_queue_size = 16;
            p.forwarding = true;
            p.renaming = true;
        }
        if variant >= Variant::MultiCore {
            config.system.cores = 2;
        }
        config
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` describing the first inconsistency found.
    pub fn validate(&self) -> SimResult<()> {
        let fail = |msg: &str| Err(SimError::Config(msg.to_string()));
        let p = &self.pipeline;
        if self.system.cores == 0 {
            return fail("system.cores must be at least 1");
        }
        if self.memory.size_bytes == 0 || self.memory.size_bytes > u32::MAX as usize {
            return fail("memory.size_bytes must be between 1 and 2^32 - 1");
        }
        if p.width == 0 || p.execute_units == 0 || p.writeback_units == 0 {
            return fail("pipeline widths and unit counts must be at least 1");
        }
        if p.pending_queue_size == 0 {
            return fail("pipeline.pending_queue_size must be at least 1");
        }
        if p.branch_prediction && p.btb_size == 0 {
            return fail("pipeline.btb_size must be at least 1 when prediction is enabled");
        }
        if p.renaming && p.physical_registers == 0 {
            return fail("pipeline.physical_registers must be at least 1 when renaming is enabled");
        }
        for (name, cache) in [
            ("l1_i", &self.cache.l1_i),
            ("l1_d", &self.cache.l1_d),
            ("shared", &self.cache.shared),
        ] {
            if !cache.enabled {
                continue;
            }
            if cache.lines == 0 {
                return Err(SimError::Config(format!("cache.{name}.lines must be at least 1")));
            }
            if !cache.line_bytes.is_power_of_two() || cache.line_bytes < 4 {
                return Err(SimError::Config(format!(
                    "cache.{name}.line_bytes must be a power of two of at least 4"
                )));
            }
        }
        if self.cache.l1_d.enabled
            && self.cache.shared.enabled
            && self.cache.l1_d.line_bytes != self.cache.shared.line_bytes
        {
            return fail("cache.l1_d and cache.shared must use the same line size");
        }
        if self.system.cores > 1 && !self.cache.l1_d.enabled {
            return fail("multi-core configurations require cache.l1_d to be enabled");
        }
        Ok(())
    }

    /// Line size used for data-side coherence and line grouping.
    pub const fn data_line_bytes(&self) -> usize {
        if self.cache.l1_d.enabled {
            self.cache.l1_d.line_bytes
        } else {
            defaults::CACHE_LINE
        }
    }
}

/// General simulation settings and options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Emit per-stage events through the tracing observer
    #[serde(default)]
    pub trace: bool,

    /// Abort the run after this many cycles
    #[serde(default = "GeneralConfig::default_max_cycles")]
    pub max_cycles: u64,
}

impl GeneralConfig {
    /// Returns the default cycle guard.
    const fn default_max_cycles() -> u64 {
        DEFAULT_MAX_CYCLES
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

/// System topology.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SystemConfig {
    /// Number of cores stepped per cycle
    #[serde(default = "SystemConfig::default_cores")]
    pub cores: usize,
}

impl SystemConfig {
    /// Returns the default core count.
    const fn default_cores() -> usize {
        1
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self { cores: 1 }
    }
}

/// Main memory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Memory size in bytes
    #[serde(default = "MemoryConfig::default_size")]
    pub size_bytes: usize,

    /// Access latency in cycles
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,
}

impl MemoryConfig {
    /// Returns the default memory size in bytes.
    const fn default_size() -> usize {
        defaults::MEMORY_SIZE
    }

    /// Returns the default memory latency in cycles.
    const fn default_latency() -> u64 {
        defaults::MEMORY_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size_bytes: defaults::MEMORY_SIZE,
            latency: defaults::MEMORY_LATENCY,
        }
    }
}

/// Cache hierarchy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheHierarchyConfig {
    /// Private instruction cache
    #[serde(default = "CacheConfig::private")]
    pub l1_i: CacheConfig,
    /// Private data cache, kept coherent across cores
    #[serde(default = "CacheConfig::private")]
    pub l1_d: CacheConfig,
    /// Shared outer cache
    #[serde(default = "CacheConfig::shared")]
    pub shared: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::private(),
            l1_d: CacheConfig::private(),
            shared: CacheConfig::shared(),
        }
    }
}

/// Individual cache level configuration.
///
/// Caches are fully associative with least-recently-used replacement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Enable this cache level
    #[serde(default)]
    pub enabled: bool,

    /// Capacity in lines
    #[serde(default = "CacheConfig::default_lines")]
    pub lines: usize,

    /// Line size in bytes
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Hit latency in cycles
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,
}

impl CacheConfig {
    /// Disabled private cache with default geometry.
    pub const fn private() -> Self {
        Self {
            enabled: false,
            lines: defaults::CACHE_LINES,
            line_bytes: defaults::CACHE_LINE,
            latency: defaults::CACHE_LATENCY,
        }
    }

    /// Disabled shared cache with default geometry.
    pub const fn shared() -> Self {
        Self {
            enabled: false,
            lines: defaults::SHARED_LINES,
            line_bytes: defaults::CACHE_LINE,
            latency: defaults::SHARED_LATENCY,
        }
    }

    /// Returns the default capacity in lines.
    const fn default_lines() -> usize {
        defaults::CACHE_LINES
    }

    /// Returns the default line size in bytes.
    const fn default_line() -> usize {
        defaults::CACHE_LINE
    }

    /// Returns the default hit latency in cycles.
    const fn default_latency() -> u64 {
        defaults::CACHE_LATENCY
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::private()
    }
}

/// Pipeline, issue policy and branch predictor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Overlap stages; when false only one instruction is in flight at a time
    #[serde(default)]
    pub pipelined: bool,

    /// Instructions fetched, decoded and issued per cycle
    #[serde(default = "PipelineConfig::default_width")]
    pub width: usize,

    /// Parallel execute units
    #[serde(default = "PipelineConfig::default_width")]
    pub execute_units: usize,

    /// Instructions retired per cycle
    #[serde(default = "PipelineConfig::default_width")]
    pub writeback_units: usize,

    /// Capacity of the stalled-instruction queue in the issue unit
    #[serde(default = "PipelineConfig::default_pending")]
    pub pending_queue_size: usize,

    /// Consult the BTB at decode and speculate past conditional branches
    #[serde(default)]
    pub branch_prediction: bool,

    /// Branch Target Buffer entries
    #[serde(default = "PipelineConfig::default_btb")]
    pub btb_size: usize,

    /// Forward results from the previous cycle's producer through a mailbox
    #[serde(default)]
    pub forwarding: bool,

    /// Rename destination registers into physical slots
    #[serde(default)]
    pub renaming: bool,

    /// Physical rename slots
    #[serde(default = "PipelineConfig::default_physical")]
    pub physical_registers: usize,
}

impl PipelineConfig {
    /// Returns the default pipeline width.
    const fn default_width() -> usize {
        defaults::PIPELINE_WIDTH
    }

    /// Returns the default pending queue capacity.
    const fn default_pending() -> usize {
        defaults::PENDING_QUEUE
    }

    /// Returns the default BTB size.
    const fn default_btb() -> usize {
        defaults::BTB_SIZE
    }

    /// Returns the default number of physical rename slots.
    const fn default_physical() -> usize {
        defaults::PHYSICAL_REGISTERS
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipelined: false,
            width: defaults::PIPELINE_WIDTH,
            execute_units: defaults::PIPELINE_WIDTH,
            writeback_units: defaults::PIPELINE_WIDTH,
            pending_queue_size: defaults::PENDING_QUEUE,
            branch_prediction: false,
            btb_size: defaults::BTB_SIZE,
            forwarding: false,
            renaming: false,
            physical_registers: defaults::PHYSICAL_REGISTERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_and_monotonic() {
        for variant in Variant::ALL {
            let config = Config::for_variant(variant);
            assert!(config.validate().is_ok(), "{variant:?}");
        }
        let predicted = Config::for_variant(Variant::Predicted);
        assert!(predicted.pipeline.branch_prediction);
        assert!(predicted.cache.l1_d.enabled);
        assert!(!predicted.pipeline.forwarding);
        assert_eq!(Config::for_variant(Variant::MultiCore).system.cores, 2);
    }

    #[test]
    fn variant_names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_name(variant.name()), Some(variant));
        }
        assert_eq!(Variant::from_name("vliw"), None);
    }

    #[test]
    fn rejects_multicore_without_data_cache() {
        let mut config = Config::default();
        config.system.cores = 2;
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn rejects_odd_line_size() {
        let json = r#"{ "cache": { "l1_d": { "enabled": true, "line_bytes": 12 } } }"#;
        assert!(Config::from_json(json).is_err());
    }

    #[test]
    fn rejects_zero_width() {
        let json = r#"{ "pipeline": { "width": 0 } }"#;
        assert!(Config::from_json(json).is_err());
    }
}
