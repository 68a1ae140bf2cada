//! Journal records replayed through the engine
//!
//! A journal line names rooms and withdrawals by journal-local references
//! rather than engine ids, since those ids only exist once the creating
//! command has run. The replay resolves references to ids as it goes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::account::{AccountId, Role};
use super::command::BanRequest;
use super::room::MatchType;

/// Entity a journal record touches, used to keep dependent records ordered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Account(AccountId),
    Reference(String),
}

/// A journal action with references still unresolved
#[derive(Debug, Clone, PartialEq)]
pub enum JournalAction {
    Register {
        account: AccountId,
        role: Role,
    },
    GrantAdmin {
        account: AccountId,
    },
    Deposit {
        actor: AccountId,
        amount: Decimal,
        external_ref: String,
    },
    Withdraw {
        actor: AccountId,
        amount: Decimal,
        /// Name later approve/reject records use; may be absent
        reference: Option<String>,
    },
    Approve {
        admin: AccountId,
        reference: String,
    },
    Reject {
        admin: AccountId,
        reference: String,
        reason: String,
    },
    Create {
        actor: AccountId,
        reference: String,
        room_code: String,
        password: String,
        match_type: MatchType,
        stake: Decimal,
    },
    Join {
        actor: AccountId,
        reference: String,
    },
    Cancel {
        actor: AccountId,
        reference: String,
    },
    Result {
        actor: AccountId,
        reference: String,
        evidence_ref: String,
    },
    Dispute {
        actor: AccountId,
        reference: String,
        reason: String,
        evidence_ref: Option<String>,
    },
    Declare {
        admin: AccountId,
        reference: String,
        winner: AccountId,
        notes: Option<String>,
    },
    Expire {
        admin: AccountId,
        reference: String,
    },
    Ban {
        admin: AccountId,
        account: AccountId,
        ban: BanRequest,
        penalty: Decimal,
    },
    Unban {
        admin: AccountId,
        account: AccountId,
    },
}

impl JournalAction {
    /// Accounts and references named directly by this action
    pub fn keys(&self) -> Vec<EntityKey> {
        use EntityKey::{Account, Reference};

        match self {
            JournalAction::Register { account, .. } | JournalAction::GrantAdmin { account } => {
                vec![Account(*account)]
            }
            JournalAction::Deposit { actor, .. } => vec![Account(*actor)],
            JournalAction::Withdraw {
                actor, reference, ..
            } => std::iter::once(Account(*actor))
                .chain(reference.clone().map(Reference))
                .collect(),
            JournalAction::Approve { admin, reference }
            | JournalAction::Reject {
                admin, reference, ..
            }
            | JournalAction::Expire { admin, reference } => {
                vec![Account(*admin), Reference(reference.clone())]
            }
            JournalAction::Create {
                actor, reference, ..
            }
            | JournalAction::Join { actor, reference }
            | JournalAction::Cancel { actor, reference }
            | JournalAction::Result {
                actor, reference, ..
            }
            | JournalAction::Dispute {
                actor, reference, ..
            } => vec![Account(*actor), Reference(reference.clone())],
            JournalAction::Declare {
                admin,
                reference,
                winner,
                ..
            } => vec![
                Account(*admin),
                Reference(reference.clone()),
                Account(*winner),
            ],
            JournalAction::Ban { admin, account, .. }
            | JournalAction::Unban { admin, account } => {
                vec![Account(*admin), Account(*account)]
            }
        }
    }

    /// Reference this action reads, as opposed to one it introduces
    pub fn used_reference(&self) -> Option<&str> {
        match self {
            JournalAction::Approve { reference, .. }
            | JournalAction::Reject { reference, .. }
            | JournalAction::Join { reference, .. }
            | JournalAction::Cancel { reference, .. }
            | JournalAction::Result { reference, .. }
            | JournalAction::Dispute { reference, .. }
            | JournalAction::Declare { reference, .. }
            | JournalAction::Expire { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

/// One parsed journal line
#[derive(Debug, Clone, PartialEq)]
pub struct JournalRecord {
    /// Line number in the source file, for diagnostics
    pub line: u64,
    /// Instant the action is evaluated at
    pub at: DateTime<Utc>,
    pub action: JournalAction,
}
