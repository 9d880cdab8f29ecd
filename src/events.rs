//! Observable log entries emitted by pool operations.

use crate::types::Address;
use crate::utils::{hex_field, FieldElement};
use log::warn;
use serde::{Deserialize, Serialize};

/// One entry of the pool's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    Deposit {
        #[serde(with = "hex_field")]
        commitment: FieldElement,
        leaf_index: u64,
        timestamp: u64,
    },
    Withdrawal {
        recipient: Address,
        #[serde(with = "hex_field")]
        nullifier_hash: FieldElement,
        relayer: Address,
        fee: u64,
    },
    Revoked {
        #[serde(with = "hex_field")]
        commitment: FieldElement,
        leaf_index: u64,
        timestamp: u64,
    },
}

/// Replays deposits and revocations into the ordered leaf list.
///
/// Revoked slots hold `empty_leaf`. Events must be in emission order; a
/// deposit must land on the next free slot and a revocation on an occupied
/// one; anything else is skipped with a warning.
#[must_use]
pub fn leaves_from_events(events: &[PoolEvent], empty_leaf: FieldElement) -> Vec<FieldElement> {
    let mut leaves = Vec::new();
    for event in events {
        match event {
            PoolEvent::Deposit {
                commitment,
                leaf_index,
                ..
            } => match usize::try_from(*leaf_index) {
                Ok(index) if index == leaves.len() => leaves.push(*commitment),
                Ok(index) if index < leaves.len() => leaves[index] = *commitment,
                _ => warn!("Skipping deposit event with out-of-order leaf index {leaf_index}"),
            },
            PoolEvent::Revoked { leaf_index, .. } => {
                match usize::try_from(*leaf_index)
                    .ok()
                    .and_then(|index| leaves.get_mut(index))
                {
                    Some(slot) => *slot = empty_leaf,
                    None => warn!("Skipping revocation event for unknown leaf {leaf_index}"),
                }
            }
            PoolEvent::Withdrawal { .. } => {}
        }
    }
    leaves
}

/// Leaf index carried by a deposit or revocation event.
#[must_use]
pub fn event_leaf_index(event: &PoolEvent) -> Option<u64> {
    match event {
        PoolEvent::Deposit { leaf_index, .. } | PoolEvent::Revoked { leaf_index, .. } => {
            Some(*leaf_index)
        }
        PoolEvent::Withdrawal { .. } => None,
    }
}
