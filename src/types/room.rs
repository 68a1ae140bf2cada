//! Room-related types for the wager settlement engine
//!
//! A room is one head-to-head wager. It records who staked, the evidence each
//! side submitted, an optional dispute, and the admin's decision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use super::account::AccountId;

/// Room identifier, assigned by the engine
pub type RoomId = u64;

/// Team size of the underlying match; does not affect payouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    OneVsOne,
    TwoVsTwo,
    ThreeVsThree,
    FourVsFour,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchType::OneVsOne => "1v1",
            MatchType::TwoVsTwo => "2v2",
            MatchType::ThreeVsThree => "3v3",
            MatchType::FourVsFour => "4v4",
        };
        f.write_str(label)
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1v1" => Ok(MatchType::OneVsOne),
            "2v2" => Ok(MatchType::TwoVsTwo),
            "3v3" => Ok(MatchType::ThreeVsThree),
            "4v4" => Ok(MatchType::FourVsFour),
            other => Err(format!("Invalid match type '{}'", other)),
        }
    }
}

/// Room lifecycle state
///
/// ```text
/// waiting ──join──> active ──dispute──> disputed
///    │                 │                   │
///  cancel        declare/expire      declare/expire
///    v                 v                   v
/// cancelled        completed <─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomStatus {
    Waiting,
    Active,
    Completed,
    Disputed,
    Cancelled,
}

impl RoomStatus {
    /// States in which the room is waiting for an admin decision
    pub fn is_settleable(&self) -> bool {
        matches!(self, RoomStatus::Active | RoomStatus::Disputed)
    }

    /// States listed among an account's open rooms
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            RoomStatus::Waiting | RoomStatus::Active | RoomStatus::Disputed
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Active => "active",
            RoomStatus::Completed => "completed",
            RoomStatus::Disputed => "disputed",
            RoomStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Result evidence submitted by one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvidence {
    /// Opaque reference into external evidence storage
    pub evidence_ref: String,
    pub submitted_at: DateTime<Utc>,
}

/// Evidence slots, one per participant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomResults {
    pub creator: Option<ResultEvidence>,
    pub opponent: Option<ResultEvidence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispute {
    pub reported_by: AccountId,
    pub evidence_ref: Option<String>,
    pub reason: String,
    pub submitted_at: DateTime<Utc>,
}

/// Which side of a room an account is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Creator,
    Opponent,
}

/// One wager between a creator and an opponent
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    /// Game-side room code, relayed to the opponent untouched
    pub external_room_code: String,
    pub external_password: String,
    pub match_type: MatchType,
    /// Amount each participant escrows
    pub stake_amount: Decimal,
    pub creator: AccountId,
    pub opponent: Option<AccountId>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation; later events never move it
    pub deadline: DateTime<Utc>,
    pub results: RoomResults,
    pub dispute: Option<Dispute>,
    pub winner: Option<AccountId>,
    pub admin_notes: Option<String>,
}

impl Room {
    /// Side `account` plays on, if it takes part in the room
    pub fn side_of(&self, account: AccountId) -> Option<Side> {
        if self.creator == account {
            Some(Side::Creator)
        } else if self.opponent == Some(account) {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Creator followed by the opponent, if joined
    pub fn participants(&self) -> Vec<AccountId> {
        std::iter::once(self.creator).chain(self.opponent).collect()
    }

    /// Combined stake of both sides
    pub fn pool(&self) -> Decimal {
        self.stake_amount * Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn room() -> Room {
        let created_at = Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap();
        Room {
            id: 1,
            external_room_code: "FF-1234".to_string(),
            external_password: "pw".to_string(),
            match_type: MatchType::OneVsOne,
            stake_amount: Decimal::new(50, 0),
            creator: 10,
            opponent: Some(20),
            status: RoomStatus::Active,
            created_at,
            deadline: created_at + Duration::hours(1),
            results: RoomResults::default(),
            dispute: None,
            winner: None,
            admin_notes: None,
        }
    }

    #[rstest]
    #[case(10, Some(Side::Creator))]
    #[case(20, Some(Side::Opponent))]
    #[case(30, None)]
    fn test_side_of(#[case] account: AccountId, #[case] expected: Option<Side>) {
        assert_eq!(room().side_of(account), expected);
    }

    #[test]
    fn test_deadline_is_exclusive() {
        let room = room();
        assert!(!room.is_past_deadline(room.deadline));
        assert!(room.is_past_deadline(room.deadline + Duration::seconds(1)));
    }

    #[test]
    fn test_pool_and_participants() {
        let mut room = room();
        assert_eq!(room.pool(), Decimal::new(100, 0));
        assert_eq!(room.participants(), vec![10, 20]);

        room.opponent = None;
        assert_eq!(room.participants(), vec![10]);
    }

    #[rstest]
    #[case("1v1", MatchType::OneVsOne)]
    #[case("2V2", MatchType::TwoVsTwo)]
    #[case("3v3", MatchType::ThreeVsThree)]
    #[case("4v4", MatchType::FourVsFour)]
    fn test_match_type_round_trips_label(#[case] input: &str, #[case] expected: MatchType) {
        let parsed: MatchType = input.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), input.to_lowercase());
    }

    #[rstest]
    #[case(RoomStatus::Waiting, false, true)]
    #[case(RoomStatus::Active, true, true)]
    #[case(RoomStatus::Disputed, true, true)]
    #[case(RoomStatus::Completed, false, false)]
    #[case(RoomStatus::Cancelled, false, false)]
    fn test_status_predicates(
        #[case] status: RoomStatus,
        #[case] settleable: bool,
        #[case] open: bool,
    ) {
        assert_eq!(status.is_settleable(), settleable);
        assert_eq!(status.is_open(), open);
    }
}
