//! Persisted pool state.

use crate::accumulator::IncrementalMerkleTree;
use crate::error::PoolError;
use crate::events::{event_leaf_index, PoolEvent};
use crate::hasher::FieldHasher;
use crate::history::RootHistory;
use crate::ledger::Ledger;
use crate::pool::{PoolParams, PrivacyPool};
use crate::transfer::NativeBalances;
use crate::types::Address;
use crate::utils::{field_from_hex, field_to_bytes, hex_field_vec, FieldElement, FIELD_BYTES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Everything needed to resume a pool. Zero hashes are derived on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub height: u32,
    pub denomination: u64,
    pub governance: Option<Address>,
    pub next_index: u64,
    #[serde(with = "hex_field_vec")]
    pub filled_subtrees: Vec<FieldElement>,
    #[serde(with = "hex_field_vec")]
    pub root_history: Vec<FieldElement>,
    pub root_cursor: usize,
    /// Recorded commitments, canonical hex
    pub commitments: Vec<String>,
    /// Spent nullifier hashes, canonical hex
    pub nullifiers: Vec<String>,
    pub events: Vec<PoolEvent>,
}

impl PoolSnapshot {
    /// Root in the history slot under the cursor.
    #[must_use]
    pub fn current_root(&self) -> Option<FieldElement> {
        self.root_history.get(self.root_cursor).copied()
    }
}

/// Contents of a state file: the pool plus the balances it custodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub pool: PoolSnapshot,
    pub balances: NativeBalances,
}

impl PoolState {
    /// Writes the state as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize pool state")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }
}

fn parse_keys(values: &[String], what: &str) -> Result<BTreeSet<[u8; FIELD_BYTES]>, PoolError> {
    values
        .iter()
        .map(|value| {
            field_from_hex(value)
                .map(field_to_bytes)
                .map_err(|e| PoolError::InvalidSnapshot(format!("bad {what} {value}: {e}")))
        })
        .collect()
}

impl<V, T, H: FieldHasher> PrivacyPool<V, T, H> {
    /// Captures the persisted state. Collaborators are not included.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        let history = self.tree.history();
        PoolSnapshot {
            height: self.params.height,
            denomination: self.params.denomination,
            governance: self.params.governance,
            next_index: self.tree.next_index(),
            filled_subtrees: self.tree.filled_subtrees().to_vec(),
            root_history: history.roots().to_vec(),
            root_cursor: history.cursor(),
            commitments: self.ledger.commitments().map(hex::encode).collect(),
            nullifiers: self.ledger.nullifiers().map(hex::encode).collect(),
            events: self.events.clone(),
        }
    }

    /// Rebuilds a pool from a snapshot and fresh collaborators.
    pub fn from_snapshot(
        snapshot: PoolSnapshot,
        hasher: H,
        verifier: V,
        assets: T,
    ) -> Result<Self, PoolError> {
        if snapshot.denomination == 0 {
            return Err(PoolError::InvalidSnapshot(
                "denomination must be greater than zero".to_string(),
            ));
        }
        let commitments = parse_keys(&snapshot.commitments, "commitment")?;
        let nullifiers = parse_keys(&snapshot.nullifiers, "nullifier hash")?;
        if (commitments.len() as u64) < snapshot.next_index {
            return Err(PoolError::InvalidSnapshot(format!(
                "{} leaves inserted but only {} commitments recorded",
                snapshot.next_index,
                commitments.len()
            )));
        }

        if let Some(index) = snapshot
            .events
            .iter()
            .filter_map(event_leaf_index)
            .find(|index| *index >= snapshot.next_index)
        {
            return Err(PoolError::InvalidSnapshot(format!(
                "event references leaf {index} but only {} leaves were inserted",
                snapshot.next_index
            )));
        }

        let root_history_size = snapshot.root_history.len();
        let history = RootHistory::from_parts(snapshot.root_history, snapshot.root_cursor)?;
        let tree = IncrementalMerkleTree::from_parts(
            hasher,
            snapshot.height,
            snapshot.next_index,
            snapshot.filled_subtrees,
            history,
        )?;

        let params = PoolParams {
            height: snapshot.height,
            root_history_size,
            denomination: snapshot.denomination,
            governance: snapshot.governance,
        };

        Ok(Self::from_parts(
            params,
            tree,
            Ledger::from_sets(commitments, nullifiers),
            snapshot.events,
            verifier,
            assets,
        ))
    }
}
