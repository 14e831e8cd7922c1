//! Simulator, toolchain and loop configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::EvoError;

/// The preselected ChampSim CRC2 configurations, one archive each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigId {
    Config1,
    Config2,
    Config3,
    Config4,
    Config5,
    Config6,
}

impl ConfigId {
    pub const ALL: [ConfigId; 6] = [
        ConfigId::Config1,
        ConfigId::Config2,
        ConfigId::Config3,
        ConfigId::Config4,
        ConfigId::Config5,
        ConfigId::Config6,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConfigId::Config1 => "config1",
            ConfigId::Config2 => "config2",
            ConfigId::Config3 => "config3",
            ConfigId::Config4 => "config4",
            ConfigId::Config5 => "config5",
            ConfigId::Config6 => "config6",
        }
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigId {
    type Err = EvoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigId::ALL
            .into_iter()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| EvoError::UnknownConfiguration(s.to_string()))
    }
}

/// The external compiler used to build candidates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Toolchain {
    /// Compiler executable.
    pub compiler: PathBuf,
    /// Flags placed before `-o <binary>`.
    pub flags: Vec<String>,
    /// Directory holding `<config>.a` archives.
    pub lib_dir: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("g++"),
            flags: vec!["-Wall".to_string(), "--std=c++11".to_string()],
            lib_dir: PathBuf::from("lib"),
        }
    }
}

impl Toolchain {
    /// Archive path for a configuration.
    pub fn library(&self, config: ConfigId) -> PathBuf {
        self.lib_dir.join(format!("{}.a", config.name()))
    }
}

/// Process group placement for toolchain and simulator children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessGroup {
    /// Each child leads its own group, killed when the child is done.
    #[default]
    Own,
    /// Children stay in the caller's group; used when the caller is itself a
    /// killable harness process.
    Inherit,
}

/// Everything the harness needs besides the candidate itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub config: ConfigId,
    /// Trace paths, evaluated in this order.
    pub traces: Vec<PathBuf>,
    pub warmup_instructions: u64,
    pub simulation_instructions: u64,
    /// Where compiled binaries are placed.
    pub binary_dir: PathBuf,
    pub toolchain: Toolchain,
    #[serde(default)]
    pub process_group: ProcessGroup,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            config: ConfigId::Config1,
            traces: Vec::new(),
            warmup_instructions: 1_000_000,
            simulation_instructions: 10_000_000,
            binary_dir: PathBuf::from("."),
            toolchain: Toolchain::default(),
            process_group: ProcessGroup::Own,
        }
    }
}

/// Bounds of the evolution loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionConfig {
    /// Number of evaluations to run.
    pub iterations: u32,
    /// Wall-clock budget for one harness invocation (seconds).
    pub timeout_secs: u64,
    /// Minimum score persisted to the accepted store.
    pub acceptance_threshold: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            timeout_secs: 240,
            acceptance_threshold: 0.5,
        }
    }
}

impl EvolutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject loop settings that cannot drive a run.
    pub fn validate(&self) -> super::Result<()> {
        if self.iterations == 0 {
            return Err(EvoError::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(EvoError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(EvoError::InvalidConfig(format!(
                "acceptance threshold {} is outside [0, 1]",
                self.acceptance_threshold
            )));
        }
        Ok(())
    }
}
