//! Append-only ledger of balance changes
//!
//! The `Ledger` stores every [`Transaction`] the engine records, keyed by id in
//! a `DashMap`. Appends only need the atomic id counter, so concurrent
//! operations on different accounts never contend on a shared lock.
//!
//! # Thread Safety
//!
//! Holding the guard of an entry (inside [`Ledger::update`]) is the entry lock.
//! It is always the last lock taken: callers may hold a room or account guard
//! while recording, never the other way round.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{
    AccountId, Bucket, NewEntry, RoomId, Transaction, TransactionId, TransactionKind,
    TransactionStatus, WagerError,
};

/// Thread-safe transaction history
#[derive(Debug)]
pub struct Ledger {
    entries: DashMap<TransactionId, Transaction>,
    /// Last id handed out; ids start at 1
    last_id: AtomicU64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            last_id: AtomicU64::new(0),
        }
    }

    /// Validate and store an entry
    ///
    /// Assigns the next id and stamps the entry with `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the amount is zero
    /// - the description is empty
    pub fn record(&self, entry: NewEntry, at: DateTime<Utc>) -> Result<Transaction, WagerError> {
        if entry.amount.is_zero() {
            return Err(WagerError::invalid_amount(entry.amount, "ledger entry"));
        }
        if entry.description.trim().is_empty() {
            return Err(WagerError::missing_field("description", "ledger entry"));
        }

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let transaction = Transaction::from_entry(id, entry, at);
        self.entries.insert(id, transaction.clone());
        Ok(transaction)
    }

    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Update an entry in place while holding its lock
    ///
    /// Only the status of an entry is ever meant to change; the closure is
    /// trusted not to touch amounts.
    pub fn update<F, R>(&self, id: TransactionId, f: F) -> Result<R, WagerError>
    where
        F: FnOnce(&mut Transaction) -> Result<R, WagerError>,
    {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(WagerError::TransactionNotFound { tx: id })?;
        f(entry.value_mut())
    }

    /// Entries of one account, most recent first
    pub fn for_account(&self, account: AccountId, limit: usize) -> Vec<Transaction> {
        let mut entries = self.collect(|tx| tx.account == account);
        entries.reverse();
        entries.truncate(limit);
        entries
    }

    /// Entries tied to one room, in recording order
    pub fn for_room(&self, room: RoomId) -> Vec<Transaction> {
        self.collect(|tx| tx.room == Some(room))
    }

    /// Entries of one kind and status, most recent first
    pub fn by_kind_status(
        &self,
        kind: TransactionKind,
        status: TransactionStatus,
    ) -> Vec<Transaction> {
        let mut entries = self.collect(|tx| tx.kind == kind && tx.status == status);
        entries.reverse();
        entries
    }

    /// Net of all balance-affecting entries for one bucket of an account
    pub fn net_movement(&self, account: AccountId, bucket: Bucket) -> Decimal {
        self.entries
            .iter()
            .filter(|entry| {
                let tx = entry.value();
                tx.account == account && tx.bucket == bucket && tx.moves_funds()
            })
            .map(|entry| entry.value().amount)
            .sum()
    }

    /// Every entry in recording order
    pub fn all(&self) -> Vec<Transaction> {
        self.collect(|_| true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn collect<P>(&self, predicate: P) -> Vec<Transaction>
    where
        P: Fn(&Transaction) -> bool,
    {
        let mut entries: Vec<Transaction> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|tx| tx.id);
        entries
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
