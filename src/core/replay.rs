//! Journal replay on top of the settlement engine
//!
//! The `Replayer` turns [`JournalRecord`]s into engine [`Command`]s. Journal
//! lines name rooms and withdrawals by their own references; the replayer
//! binds each reference to the engine id when the creating command succeeds
//! and resolves it for every later command.
//!
//! # Thread Safety
//!
//! Bindings live in `DashMap`s behind `Arc`, so clones of a `Replayer` share
//! them and can replay independent records from different tasks.

use dashmap::DashMap;
use std::sync::Arc;

use super::SettlementEngine;
use crate::types::{
    Command, EntityKey, JournalAction, JournalRecord, Outcome, RoomId, TransactionId,
    WagerError,
};

/// Replays journal records through a shared engine
#[derive(Debug, Clone)]
pub struct Replayer {
    engine: SettlementEngine,
    rooms: Arc<DashMap<String, RoomId>>,
    withdrawals: Arc<DashMap<String, TransactionId>>,
}

impl Replayer {
    pub fn new(engine: SettlementEngine) -> Self {
        Self {
            engine,
            rooms: Arc::new(DashMap::new()),
            withdrawals: Arc::new(DashMap::new()),
        }
    }

    pub fn engine(&self) -> &SettlementEngine {
        &self.engine
    }

    /// Resolve and apply one record at the instant it carries
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a creating record reuses a reference that is already bound
    /// - a record uses a reference no earlier record bound
    /// - the engine rejects the command
    pub fn apply(&self, record: &JournalRecord) -> Result<Outcome, WagerError> {
        self.ensure_unbound(&record.action)?;
        let command = self.resolve(&record.action)?;
        let outcome = self.engine.apply(command, record.at)?;
        self.bind(&record.action, &outcome);
        Ok(outcome)
    }

    /// Every entity the record may touch
    ///
    /// Besides the accounts and reference the record names, this includes the
    /// accounts already bound to that reference: the participants of a room,
    /// or the owner of a withdrawal.
    pub fn keys(&self, record: &JournalRecord) -> Vec<EntityKey> {
        let mut keys = record.action.keys();

        if let Some(reference) = record.action.used_reference() {
            if let Some(room) = self.rooms.get(reference).map(|id| *id) {
                if let Ok(room) = self.engine.room(room) {
                    keys.extend(room.participants().into_iter().map(EntityKey::Account));
                }
            }
            if let Some(tx) = self.withdrawals.get(reference).map(|id| *id) {
                if let Ok(tx) = self.engine.transaction(tx) {
                    keys.push(EntityKey::Account(tx.account));
                }
            }
        }

        keys
    }

    fn ensure_unbound(&self, action: &JournalAction) -> Result<(), WagerError> {
        let reference = match action {
            JournalAction::Create { reference, .. } => Some(reference),
            JournalAction::Withdraw { reference, .. } => reference.as_ref(),
            _ => None,
        };

        match reference {
            Some(reference)
                if self.rooms.contains_key(reference)
                    || self.withdrawals.contains_key(reference) =>
            {
                Err(WagerError::DuplicateReference {
                    reference: reference.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn room(&self, reference: &str) -> Result<RoomId, WagerError> {
        self.rooms
            .get(reference)
            .map(|id| *id)
            .ok_or_else(|| WagerError::UnknownReference {
                reference: reference.to_string(),
            })
    }

    fn withdrawal(&self, reference: &str) -> Result<TransactionId, WagerError> {
        self.withdrawals
            .get(reference)
            .map(|id| *id)
            .ok_or_else(|| WagerError::UnknownReference {
                reference: reference.to_string(),
            })
    }

    fn resolve(&self, action: &JournalAction) -> Result<Command, WagerError> {
        let command = match action.clone() {
            JournalAction::Register { account, role } => {
                Command::RegisterAccount { account, role }
            }
            JournalAction::GrantAdmin { account } => Command::GrantAdmin { account },
            JournalAction::Deposit {
                actor,
                amount,
                external_ref,
            } => Command::Deposit {
                actor,
                amount,
                external_ref,
            },
            JournalAction::Withdraw { actor, amount, .. } => {
                Command::RequestWithdrawal { actor, amount }
            }
            JournalAction::Approve { admin, reference } => Command::ApproveWithdrawal {
                admin,
                transaction: self.withdrawal(&reference)?,
            },
            JournalAction::Reject {
                admin,
                reference,
                reason,
            } => Command::RejectWithdrawal {
                admin,
                transaction: self.withdrawal(&reference)?,
                reason,
            },
            JournalAction::Create {
                actor,
                room_code,
                password,
                match_type,
                stake,
                ..
            } => Command::CreateRoom {
                actor,
                room_code,
                password,
                match_type,
                stake,
            },
            JournalAction::Join { actor, reference } => Command::JoinRoom {
                actor,
                room: self.room(&reference)?,
            },
            JournalAction::Cancel { actor, reference } => Command::CancelRoom {
                actor,
                room: self.room(&reference)?,
            },
            JournalAction::Result {
                actor,
                reference,
                evidence_ref,
            } => Command::SubmitResult {
                actor,
                room: self.room(&reference)?,
                evidence_ref,
            },
            JournalAction::Dispute {
                actor,
                reference,
                reason,
                evidence_ref,
            } => Command::SubmitDispute {
                actor,
                room: self.room(&reference)?,
                reason,
                evidence_ref,
            },
            JournalAction::Declare {
                admin,
                reference,
                winner,
                notes,
            } => Command::DeclareWinner {
                admin,
                room: self.room(&reference)?,
                winner,
                notes,
            },
            JournalAction::Expire { admin, reference } => Command::ExpireRoom {
                admin,
                room: self.room(&reference)?,
            },
            JournalAction::Ban {
                admin,
                account,
                ban,
                penalty,
            } => Command::BanAccount {
                admin,
                account,
                ban,
                penalty,
            },
            JournalAction::Unban { admin, account } => Command::UnbanAccount { admin, account },
        };
        Ok(command)
    }

    fn bind(&self, action: &JournalAction, outcome: &Outcome) {
        match (action, outcome) {
            (JournalAction::Create { reference, .. }, Outcome::Room(room)) => {
                self.rooms.insert(reference.clone(), room.id);
            }
            (
                JournalAction::Withdraw {
                    reference: Some(reference),
                    ..
                },
                Outcome::Transaction(tx),
            ) => {
                self.withdrawals.insert(reference.clone(), tx.id);
            }
            _ => {}
        }
    }
}
