//! Shared uncore construction and top-level `System` type.
//!
//! Everything the cores share lives here:
//! 1. **Memory:** Flat main memory sized from `config.memory`.
//! 2. **Directory:** The MSI directory with line locks and peer command queues.
//! 3. **Shared Level:** The optional shared cache and its latencies.

use crate::config::Config;
use crate::core::units::cache::msi::MsiDirectory;
use crate::soc::interconnect::SharedLevel;
use crate::soc::memory::Memory;

/// State shared by every core.
#[derive(Debug)]
pub struct System {
    /// Main memory.
    pub memory: Memory,
    /// Coherence directory.
    pub directory: MsiDirectory,
    /// Shared outer level.
    pub shared: SharedLevel,
}

impl System {
    /// Builds the uncore described by `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated simulator configuration.
    ///
    /// # Returns
    ///
    /// Zeroed memory, an empty directory for `config.system.cores` caches and a
    /// cold shared level.
    pub fn new(config: &Config) -> Self {
        Self {
            memory: Memory::new(config.memory.size_bytes),
            directory: MsiDirectory::new(config.system.cores),
            shared: SharedLevel::new(config),
        }
    }

    /// Forgets every cached line and lock while keeping the memory image.
    pub fn reset_caches(&mut self, config: &Config) {
        self.directory = MsiDirectory::new(config.system.cores);
        self.shared = SharedLevel::new(config);
    }
}
