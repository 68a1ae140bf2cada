//! Thread-safe account storage
//!
//! `AccountManager` keeps every [`Account`] in a `DashMap`, giving each
//! account its own lock. Operations on different accounts run in parallel;
//! operations on the same account are serialized by the entry guard held in
//! [`AccountManager::update`].
//!
//! # Thread Safety
//!
//! Within the engine the account lock sits between the room lock and the
//! ledger lock. A closure passed to `update` may record ledger entries but must
//! never reach back into the account map.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::{Account, AccountId, Role, WagerError};

/// Thread-safe account state manager
#[derive(Debug)]
pub struct AccountManager {
    accounts: DashMap<AccountId, Account>,
}

impl AccountManager {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Create a zero-balance account
    ///
    /// # Errors
    ///
    /// Returns `AccountExists` if the id is already registered.
    pub fn register(
        &self,
        id: AccountId,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Result<Account, WagerError> {
        match self.accounts.entry(id) {
            Entry::Occupied(_) => Err(WagerError::AccountExists { account: id }),
            Entry::Vacant(vacant) => {
                let account = Account::new(id, role, created_at);
                vacant.insert(account.clone());
                Ok(account)
            }
        }
    }

    /// Snapshot of an account
    pub fn get(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Update an account using a closure
    ///
    /// The closure runs while the account is locked, so a check-then-mutate
    /// sequence inside it is atomic with respect to every other operation on
    /// the same account. Unlike storage that creates entries on demand,
    /// unknown accounts are an error here: only registration creates accounts.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown id, or whatever the closure
    /// returns.
    pub fn update<F, R>(&self, id: AccountId, f: F) -> Result<R, WagerError>
    where
        F: FnOnce(&mut Account) -> Result<R, WagerError>,
    {
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or(WagerError::AccountNotFound { account: id })?;
        f(entry.value_mut())
    }

    /// All accounts ordered by id
    pub fn all(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }
}

impl Default for AccountManager {
    fn default() -> Self {
        Self::new()
    }
}
