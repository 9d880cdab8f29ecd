//! Asset movement behind the pool.
//!
//! The pool decides *whether* funds move; an [`AssetTransfer`] decides *how*.
//! An implementation must either apply a transfer completely or return an
//! error without side effects.

use crate::types::Address;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a transfer was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Insufficient funds for {account}: balance {balance}, needed {needed}")]
    InsufficientFunds {
        account: String,
        balance: u64,
        needed: u64,
    },
    #[error("Refund of {0} is not supported for native currency")]
    UnsupportedRefund(u64),
    #[error("Fee {fee} exceeds amount {amount}")]
    FeeExceedsAmount { fee: u64, amount: u64 },
    #[error("Balance overflow for {0}")]
    Overflow(String),
}

/// Payout of one withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub recipient: Address,
    pub relayer: Address,
    pub amount: u64,
    pub fee: u64,
    pub refund: u64,
}

/// Moves the pool denomination in and out.
pub trait AssetTransfer {
    /// Collects `amount` from `payer` into the pool.
    fn transfer_in(&mut self, payer: &Address, amount: u64) -> Result<(), TransferError>;

    /// Releases one denomination to the recipient and relayer.
    fn transfer_out(&mut self, payout: &Payout) -> Result<(), TransferError>;
}

/// In-memory native-currency balances with a pool custody account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBalances {
    balances: BTreeMap<Address, u64>,
    pool_balance: u64,
}

impl NativeBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `amount` into `account` (test and demo funding).
    pub fn credit(&mut self, account: Address, amount: u64) -> Result<(), TransferError> {
        let balance = self.balance_of(&account);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(account.to_string()))?;
        self.balances.insert(account, updated);
        Ok(())
    }

    #[must_use]
    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Funds held by the pool.
    #[must_use]
    pub fn pool_balance(&self) -> u64 {
        self.pool_balance
    }
}

impl AssetTransfer for NativeBalances {
    fn transfer_in(&mut self, payer: &Address, amount: u64) -> Result<(), TransferError> {
        let balance = self.balance_of(payer);
        if balance < amount {
            return Err(TransferError::InsufficientFunds {
                account: payer.to_string(),
                balance,
                needed: amount,
            });
        }
        let pool_balance = self
            .pool_balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow("pool".to_string()))?;

        self.balances.insert(*payer, balance - amount);
        self.pool_balance = pool_balance;
        debug!("Collected {amount} from {payer}");
        Ok(())
    }

    fn transfer_out(&mut self, payout: &Payout) -> Result<(), TransferError> {
        if payout.refund != 0 {
            return Err(TransferError::UnsupportedRefund(payout.refund));
        }
        if payout.fee > payout.amount {
            return Err(TransferError::FeeExceedsAmount {
                fee: payout.fee,
                amount: payout.amount,
            });
        }
        if self.pool_balance < payout.amount {
            return Err(TransferError::InsufficientFunds {
                account: "pool".to_string(),
                balance: self.pool_balance,
                needed: payout.amount,
            });
        }

        let net = payout.amount - payout.fee;
        let recipient_balance = self
            .balance_of(&payout.recipient)
            .checked_add(net)
            .ok_or_else(|| TransferError::Overflow(payout.recipient.to_string()))?;
        // Recipient and relayer may be the same account.
        let relayer_balance = if payout.relayer == payout.recipient {
            recipient_balance.checked_add(payout.fee)
        } else {
            self.balance_of(&payout.relayer).checked_add(payout.fee)
        }
        .ok_or_else(|| TransferError::Overflow(payout.relayer.to_string()))?;

        self.pool_balance -= payout.amount;
        self.balances.insert(payout.recipient, recipient_balance);
        if payout.fee > 0 || payout.relayer == payout.recipient {
            self.balances.insert(payout.relayer, relayer_balance);
        }
        debug!(
            "Paid {net} to {} and fee {} to {}",
            payout.recipient, payout.fee, payout.relayer
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_transfer_in_moves_funds() {
        let mut assets = NativeBalances::new();
        assets.credit(addr(1), 100).unwrap();
        assets.transfer_in(&addr(1), 60).unwrap();
        assert_eq!(assets.balance_of(&addr(1)), 40);
        assert_eq!(assets.pool_balance(), 60);
    }

    #[test]
    fn test_transfer_in_insufficient_funds() {
        let mut assets = NativeBalances::new();
        assets.credit(addr(1), 10).unwrap();
        let before = assets.clone();
        assert!(matches!(
            assets.transfer_in(&addr(1), 60),
            Err(TransferError::InsufficientFunds { needed: 60, .. })
        ));
        assert_eq!(assets, before);
    }

    #[test]
    fn test_transfer_out_splits_fee() {
        let mut assets = NativeBalances::new();
        assets.credit(addr(1), 100).unwrap();
        assets.transfer_in(&addr(1), 100).unwrap();

        let payout = Payout {
            recipient: addr(2),
            relayer: addr(3),
            amount: 100,
            fee: 10,
            refund: 0,
        };
        assets.transfer_out(&payout).unwrap();
        assert_eq!(assets.balance_of(&addr(2)), 90);
        assert_eq!(assets.balance_of(&addr(3)), 10);
        assert_eq!(assets.pool_balance(), 0);
    }

    #[test]
    fn test_transfer_out_same_recipient_and_relayer() {
        let mut assets = NativeBalances::new();
        assets.credit(addr(1), 100).unwrap();
        assets.transfer_in(&addr(1), 100).unwrap();

        let payout = Payout {
            recipient: addr(2),
            relayer: addr(2),
            amount: 100,
            fee: 25,
            refund: 0,
        };
        assets.transfer_out(&payout).unwrap();
        assert_eq!(assets.balance_of(&addr(2)), 100);
    }

    #[test]
    fn test_transfer_out_rejects_refund() {
        let mut assets = NativeBalances::new();
        let payout = Payout {
            recipient: addr(2),
            relayer: addr(3),
            amount: 100,
            fee: 0,
            refund: 1,
        };
        assert_eq!(
            assets.transfer_out(&payout),
            Err(TransferError::UnsupportedRefund(1))
        );
    }
}
