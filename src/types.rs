//! Type definitions shared by the pool, the proof adapter and the CLI.

use crate::utils::{bytes_to_field, hex_field, validate_and_strip_hex, FieldElement};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of an account address in bytes.
pub const ADDRESS_BYTES: usize = 20;

/// Account identifier for depositors, recipients, relayers and governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Field representation used as a public input: the address left-padded
    /// to 32 bytes and read as a big-endian number.
    #[must_use]
    pub fn to_field(&self) -> FieldElement {
        let mut full = [0u8; 32];
        full[32 - ADDRESS_BYTES..].copy_from_slice(&self.0);
        bytes_to_field(&full)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let stripped = validate_and_strip_hex(s, ADDRESS_BYTES * 2)
            .with_context(|| format!("Invalid address '{s}'"))?;
        let decoded = hex::decode(stripped).context("Failed to decode address from hex")?;
        let mut bytes = [0u8; ADDRESS_BYTES];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Transaction context of one pool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    /// Account submitting the operation
    pub caller: Address,
    /// Unix timestamp the operation executes at
    pub timestamp: u64,
}

impl TxContext {
    #[must_use]
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }

    /// Context stamped with the current wall-clock time.
    pub fn now(caller: Address) -> Result<Self> {
        Ok(Self {
            caller,
            timestamp: unix_now()?,
        })
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| anyhow::anyhow!("System clock unavailable: {}", e))
}

/// Public inputs of a withdrawal proof.
///
/// The circuit reads these positionally; [`PublicInputs::to_instance`] is the
/// only place that fixes the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicInputs {
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub recipient: Address,
    pub relayer: Address,
    pub fee: u64,
    pub refund: u64,
}

/// Number of public inputs a withdrawal proof commits to.
pub const PUBLIC_INPUT_COUNT: usize = 6;

impl PublicInputs {
    /// `(root, nullifierHash, recipient, relayer, fee, refund)` as field elements.
    #[must_use]
    pub fn to_instance(&self) -> [FieldElement; PUBLIC_INPUT_COUNT] {
        [
            self.root,
            self.nullifier_hash,
            self.recipient.to_field(),
            self.relayer.to_field(),
            FieldElement::from(self.fee),
            FieldElement::from(self.refund),
        ]
    }
}

/// A withdrawal as submitted to the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub proof: Vec<u8>,
    pub inputs: PublicInputs,
}

/// Serialized withdrawal proof handed from the note holder to a relayer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalProof {
    /// Root the proof was built against
    #[serde(with = "hex_field")]
    pub root: FieldElement,
    /// Hash of the note's nullifier
    #[serde(with = "hex_field")]
    pub nullifier_hash: FieldElement,
    pub recipient: Address,
    pub relayer: Address,
    pub fee: u64,
    pub refund: u64,
    /// Raw ZK-SNARK proof bytes
    pub zkp_proof: Vec<u8>,
    /// Unix timestamp when proof was generated
    pub timestamp: u64,
}

impl WithdrawalProof {
    const TIMESTAMP_TOLERANCE_SECS: u64 = 30;

    /// Structural checks before the proof is submitted.
    ///
    /// # Errors
    /// Returns an error if the proof bytes are missing or exceed
    /// `max_proof_size`, or if the timestamp lies in the future.
    pub fn validate(&self, max_proof_size: usize) -> Result<()> {
        debug!("ZK proof size: {} bytes", self.zkp_proof.len());
        debug!("Timestamp: {}", self.timestamp);

        if self.zkp_proof.is_empty() {
            return Err(anyhow::anyhow!(
                "ZK proof cannot be empty. The proof data is missing."
            ));
        }
        if self.zkp_proof.len() > max_proof_size {
            return Err(anyhow::anyhow!(
                "ZK proof size exceeds limit: {} bytes (max {} bytes)",
                self.zkp_proof.len(),
                max_proof_size
            ));
        }

        let current_timestamp = unix_now()?;
        if self.timestamp > current_timestamp + Self::TIMESTAMP_TOLERANCE_SECS {
            return Err(anyhow::anyhow!(
                "Timestamp is too far in the future: {} (current: {}, tolerance: {}s)",
                self.timestamp,
                current_timestamp,
                Self::TIMESTAMP_TOLERANCE_SECS
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            root: self.root,
            nullifier_hash: self.nullifier_hash,
            recipient: self.recipient,
            relayer: self.relayer,
            fee: self.fee,
            refund: self.refund,
        }
    }

    #[must_use]
    pub fn into_request(self) -> WithdrawalRequest {
        WithdrawalRequest {
            inputs: self.public_inputs(),
            proof: self.zkp_proof,
        }
    }
}
