//! Two-bucket wallet and its balance rules
//!
//! A [`Wallet`] is a plain value. Every rule takes a wallet by value and
//! returns the resulting wallet together with the per-bucket [`Movement`]s it
//! produced, so the engine can record exactly one ledger entry per bucket
//! touched and tests can exercise the rules without any storage.
//!
//! # Draw-down order
//!
//! Debits consume the positive part of the deposit bucket first; whatever is
//! left is taken from the winning bucket, which may go negative. Debits never
//! check sufficiency: callers that need funds to be present check
//! [`Wallet::has_sufficient_funds`] first, while penalty debits intentionally
//! leave the account in debt.

use rust_decimal::Decimal;
use std::fmt;

use super::error::WagerError;

/// Wallet bucket a balance change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// User-funded money
    Deposit,
    /// Money won from settled rooms, the only withdrawable bucket
    Winning,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Deposit => f.write_str("deposit"),
            Bucket::Winning => f.write_str("winning"),
        }
    }
}

/// Signed change applied to one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub bucket: Bucket,
    /// Positive increases the bucket, negative decreases it
    pub amount: Decimal,
}

/// Per-account balance split into deposit and winning buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wallet {
    pub deposit_balance: Decimal,
    pub winning_balance: Decimal,
}

/// Result of a wallet rule: the new wallet and the movements that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub wallet: Wallet,
    pub movements: Vec<Movement>,
}

impl Wallet {
    pub fn new(deposit_balance: Decimal, winning_balance: Decimal) -> Self {
        Wallet {
            deposit_balance,
            winning_balance,
        }
    }

    /// Sum of both buckets, negative when the account is in debt
    ///
    /// Wallets produced by the balance rules always have a representable
    /// total; a hand-built wallet past that range saturates at the bound.
    pub fn total(&self) -> Decimal {
        self.deposit_balance.saturating_add(self.winning_balance)
    }

    /// Sum of both buckets, `None` if it does not fit a `Decimal`
    pub fn checked_total(&self) -> Option<Decimal> {
        self.deposit_balance.checked_add(self.winning_balance)
    }

    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.total() >= amount
    }

    pub fn balance(&self, bucket: Bucket) -> Decimal {
        match bucket {
            Bucket::Deposit => self.deposit_balance,
            Bucket::Winning => self.winning_balance,
        }
    }

    /// Debit using the deposit-then-winning draw-down
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `amount` is not strictly positive
    /// - subtracting from the winning bucket would overflow
    pub fn debit(self, amount: Decimal) -> Result<Applied, WagerError> {
        ensure_positive(amount, "debit")?;

        let from_deposit = amount.min(self.deposit_balance.max(Decimal::ZERO));
        let from_winning = amount - from_deposit;

        let deposit_balance = self.deposit_balance - from_deposit;
        let winning_balance = self
            .winning_balance
            .checked_sub(from_winning)
            .ok_or_else(|| WagerError::arithmetic_overflow("debit"))?;

        let movements = [
            (Bucket::Deposit, from_deposit),
            (Bucket::Winning, from_winning),
        ]
        .into_iter()
        .filter(|(_, taken)| !taken.is_zero())
        .map(|(bucket, taken)| Movement {
            bucket,
            amount: -taken,
        })
        .collect();

        applied(
            Wallet {
                deposit_balance,
                winning_balance,
            },
            movements,
            "debit",
        )
    }

    /// Debit a single bucket without draw-down
    pub fn debit_bucket(self, amount: Decimal, bucket: Bucket) -> Result<Applied, WagerError> {
        ensure_positive(amount, "debit")?;
        let updated = self
            .balance(bucket)
            .checked_sub(amount)
            .ok_or_else(|| WagerError::arithmetic_overflow("debit"))?;

        applied(
            self.with_balance(bucket, updated),
            vec![Movement {
                bucket,
                amount: -amount,
            }],
            "debit",
        )
    }

    /// Credit the named bucket
    pub fn credit(self, amount: Decimal, bucket: Bucket) -> Result<Applied, WagerError> {
        ensure_positive(amount, "credit")?;
        let updated = self
            .balance(bucket)
            .checked_add(amount)
            .ok_or_else(|| WagerError::arithmetic_overflow("credit"))?;

        applied(
            self.with_balance(bucket, updated),
            vec![Movement { bucket, amount }],
            "credit",
        )
    }

    /// Zero both buckets, reporting what each one lost (or gained, if it was
    /// negative)
    pub fn seize(self) -> Applied {
        let movements = [
            (Bucket::Deposit, self.deposit_balance),
            (Bucket::Winning, self.winning_balance),
        ]
        .into_iter()
        .filter(|(_, balance)| !balance.is_zero())
        .map(|(bucket, balance)| Movement {
            bucket,
            amount: -balance,
        })
        .collect();

        Applied {
            wallet: Wallet::default(),
            movements,
        }
    }

    fn with_balance(self, bucket: Bucket, value: Decimal) -> Self {
        match bucket {
            Bucket::Deposit => Wallet {
                deposit_balance: value,
                ..self
            },
            Bucket::Winning => Wallet {
                winning_balance: value,
                ..self
            },
        }
    }
}

/// Accept a rule's result only if the wallet total stays representable
fn applied(
    wallet: Wallet,
    movements: Vec<Movement>,
    operation: &str,
) -> Result<Applied, WagerError> {
    if wallet.checked_total().is_none() {
        return Err(WagerError::arithmetic_overflow(operation));
    }
    Ok(Applied { wallet, movements })
}

fn ensure_positive(amount: Decimal, operation: &str) -> Result<(), WagerError> {
    if amount <= Decimal::ZERO {
        return Err(WagerError::invalid_amount(amount, operation));
    }
    Ok(())
}
