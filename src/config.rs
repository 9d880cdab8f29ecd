//! Configuration file support for the privacy pool tools.
//!
//! Every section and field has a default, so a partial (or missing) TOML file
//! is always usable.

use crate::accumulator::DEFAULT_TREE_HEIGHT;
use crate::history::ROOT_HISTORY_SIZE;
use crate::pool::PoolParams;
use crate::types::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_DENOMINATION: u64 = 1_000_000_000;
const DEFAULT_CIRCUIT_K: u32 = crate::CIRCUIT_K;
const DEFAULT_MAX_PROOF_FILE_SIZE: u64 = 1024 * 1024;
const DEFAULT_MAX_ZK_PROOF_SIZE: usize = 512 * 1024;

/// Configuration for the privacy pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub proof: ProofConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_root_history_size")]
    pub root_history_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_denomination")]
    pub denomination: u64,
    /// Hex address allowed to revoke commitments
    #[serde(default)]
    pub governance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofConfig {
    #[serde(default = "default_circuit_k")]
    pub circuit_k: u32,
    #[serde(default = "default_max_proof_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_zk_proof_size")]
    pub max_zk_proof_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_file")]
    pub file: PathBuf,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_TREE_HEIGHT,
            root_history_size: ROOT_HISTORY_SIZE,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            denomination: DEFAULT_DENOMINATION,
            governance: None,
        }
    }
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            circuit_k: DEFAULT_CIRCUIT_K,
            max_file_size: DEFAULT_MAX_PROOF_FILE_SIZE,
            max_zk_proof_size: DEFAULT_MAX_ZK_PROOF_SIZE,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: default_state_file(),
        }
    }
}

fn default_height() -> u32 {
    DEFAULT_TREE_HEIGHT
}

fn default_root_history_size() -> usize {
    ROOT_HISTORY_SIZE
}

fn default_denomination() -> u64 {
    DEFAULT_DENOMINATION
}

fn default_circuit_k() -> u32 {
    DEFAULT_CIRCUIT_K
}

fn default_max_proof_file_size() -> u64 {
    DEFAULT_MAX_PROOF_FILE_SIZE
}

fn default_max_zk_proof_size() -> usize {
    DEFAULT_MAX_ZK_PROOF_SIZE
}

fn default_state_file() -> PathBuf {
    PathBuf::from("pool_state.json")
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn load_from_file_or_default(path: &PathBuf) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }

    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Pool construction parameters described by this configuration.
    pub fn to_params(&self) -> Result<PoolParams> {
        let governance = self
            .pool
            .governance
            .as_deref()
            .map(str::parse::<Address>)
            .transpose()
            .context("Invalid governance address in config")?;

        Ok(PoolParams {
            height: self.tree.height,
            root_history_size: self.tree.root_history_size,
            denomination: self.pool.denomination,
            governance,
        })
    }
}
