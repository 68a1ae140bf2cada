//! Thread-safe room storage with a participant index
//!
//! Rooms live in a `DashMap` keyed by id; the entry guard taken in
//! [`RoomStore::update`] is the room lock and the first lock in the engine's
//! order (room, then account, then ledger entry). A second map indexes room ids
//! by participant so an account's rooms can be listed without scanning.

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{AccountId, Room, RoomId, WagerError};

/// Thread-safe room state manager
#[derive(Debug)]
pub struct RoomStore {
    rooms: DashMap<RoomId, Room>,
    /// Last id handed out; ids start at 1
    last_id: AtomicU64,
    participants: DashMap<AccountId, BTreeSet<RoomId>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            last_id: AtomicU64::new(0),
            participants: DashMap::new(),
        }
    }

    /// Reserve an id for a room about to be created
    pub fn allocate_id(&self) -> RoomId {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store a new room and index its participants
    pub fn insert(&self, room: Room) {
        let participants = room.participants();
        let id = room.id;
        self.rooms.insert(id, room);
        for account in participants {
            self.link(account, id);
        }
    }

    pub fn get(&self, id: RoomId) -> Option<Room> {
        self.rooms.get(&id).map(|entry| entry.value().clone())
    }

    /// Update a room using a closure while holding its lock
    ///
    /// # Errors
    ///
    /// Returns `RoomNotFound` for an unknown id, or whatever the closure
    /// returns.
    pub fn update<F, R>(&self, id: RoomId, f: F) -> Result<R, WagerError>
    where
        F: FnOnce(&mut Room) -> Result<R, WagerError>,
    {
        let mut entry = self
            .rooms
            .get_mut(&id)
            .ok_or(WagerError::RoomNotFound { room: id })?;
        f(entry.value_mut())
    }

    /// Delete a room and drop it from the participant index
    pub fn remove(&self, id: RoomId) -> Option<Room> {
        let (_, room) = self.rooms.remove(&id)?;
        for account in room.participants() {
            self.unlink(account, id);
        }
        Some(room)
    }

    /// Record that `account` takes part in `room`
    pub fn link(&self, account: AccountId, room: RoomId) {
        self.participants.entry(account).or_default().insert(room);
    }

    fn unlink(&self, account: AccountId, room: RoomId) {
        if let Some(mut rooms) = self.participants.get_mut(&account) {
            rooms.remove(&room);
        }
    }

    /// Rooms `account` takes part in, newest first
    pub fn rooms_for(&self, account: AccountId) -> Vec<Room> {
        // Copy the ids out so no index guard is held while rooms are read
        let ids: Vec<RoomId> = self
            .participants
            .get(&account)
            .map(|rooms| rooms.iter().rev().copied().collect())
            .unwrap_or_default();

        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Rooms matching `predicate`, newest first
    pub fn filter<P>(&self, predicate: P) -> Vec<Room>
    where
        P: Fn(&Room) -> bool,
    {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchType, RoomResults, RoomStatus};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn room(store: &RoomStore, creator: AccountId, minutes: i64) -> Room {
        let created_at = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
            + Duration::minutes(minutes);
        Room {
            id: store.allocate_id(),
            external_room_code: "CODE".to_string(),
            external_password: "secret".to_string(),
            match_type: MatchType::TwoVsTwo,
            stake_amount: Decimal::new(25, 0),
            creator,
            opponent: None,
            status: RoomStatus::Waiting,
            created_at,
            deadline: created_at + Duration::hours(1),
            results: RoomResults::default(),
            dispute: None,
            winner: None,
            admin_notes: None,
        }
    }

    #[test]
    fn test_allocate_id_is_sequential() {
        let store = RoomStore::new();
        assert_eq!(store.allocate_id(), 1);
        assert_eq!(store.allocate_id(), 2);
    }

    #[test]
    fn test_insert_indexes_creator() {
        let store = RoomStore::new();
        let first = room(&store, 1, 0);
        let second = room(&store, 1, 5);
        store.insert(first.clone());
        store.insert(second.clone());

        let ids: Vec<RoomId> = store.rooms_for(1).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(store.rooms_for(2).is_empty());
    }

    #[test]
    fn test_remove_unlinks_all_participants() {
        let store = RoomStore::new();
        let mut joined = room(&store, 1, 0);
        joined.opponent = Some(2);
        store.insert(joined.clone());

        assert_eq!(store.rooms_for(2).len(), 1);
        assert!(store.remove(joined.id).is_some());
        assert!(store.rooms_for(1).is_empty());
        assert!(store.rooms_for(2).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_missing_room() {
        let store = RoomStore::new();
        assert_eq!(
            store.update(7, |_| Ok(())),
            Err(WagerError::RoomNotFound { room: 7 })
        );
    }

    #[test]
    fn test_filter_orders_newest_first() {
        let store = RoomStore::new();
        let older = room(&store, 1, 0);
        let newer = room(&store, 2, 30);
        let mut active = room(&store, 3, 60);
        active.status = RoomStatus::Active;
        for r in [older.clone(), newer.clone(), active] {
            store.insert(r);
        }

        let waiting = store.filter(|r| r.status == RoomStatus::Waiting);
        let ids: Vec<RoomId> = waiting.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(store.len(), 3);
    }
}
