//! Account-related types for the wager settlement engine
//!
//! This module defines the Account structure, its role, and its ban state.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::wallet::Wallet;

/// Account identifier
pub type AccountId = u32;

/// Privilege level of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Player,
    /// May arbitrate rooms, ban accounts and settle withdrawals
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player => f.write_str("player"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "player" => Ok(Role::Player),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Invalid role '{}'", other)),
        }
    }
}

/// Kind of ban an admin can impose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BanType {
    Temporary,
    Permanent,
}

impl FromStr for BanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "temporary" => Ok(BanType::Temporary),
            "permanent" => Ok(BanType::Permanent),
            other => Err(format!("Invalid ban type '{}'", other)),
        }
    }
}

/// Current ban state of an account
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BanState {
    #[default]
    None,
    Temporary {
        until: DateTime<Utc>,
        reason: String,
    },
    Permanent {
        reason: String,
    },
}

impl BanState {
    /// Whether the ban is in force at `now`
    ///
    /// A temporary ban stops applying once `until` is reached.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self {
            BanState::None => false,
            BanState::Temporary { until, .. } => now < *until,
            BanState::Permanent { .. } => true,
        }
    }

    pub fn is_banned(&self) -> bool {
        !matches!(self, BanState::None)
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self {
            BanState::Temporary { until, .. } => Some(*until),
            _ => None,
        }
    }
}

/// Account state
///
/// Accounts are created at registration and never deleted. The wallet is only
/// mutated by the settlement engine; the account holds no references to the
/// rooms it takes part in.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub wallet: Wallet,
    pub ban: BanState,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an account with an empty wallet and no ban
    pub fn new(id: AccountId, role: Role, created_at: DateTime<Utc>) -> Self {
        Account {
            id,
            role,
            wallet: Wallet::default(),
            ban: BanState::None,
            created_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Clear a temporary ban whose end has been reached
    ///
    /// Returns true if a ban was lifted.
    pub fn lift_expired_ban(&mut self, now: DateTime<Utc>) -> bool {
        if matches!(self.ban, BanState::Temporary { .. }) && !self.ban.is_active(now) {
            self.ban = BanState::None;
            return true;
        }
        false
    }
}
