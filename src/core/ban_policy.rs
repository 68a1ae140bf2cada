//! Ban sanctions
//!
//! Turning a [`BanRequest`] into a ban state and working out what it costs the
//! account are pure functions, kept apart from the engine so the money rules
//! can be tested on plain wallets.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::types::{
    AccountId, BanRequest, BanState, BanType, Movement, TransactionKind, WagerError, Wallet,
};

/// Wallet after a ban and the ledger movements it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Sanction {
    pub wallet: Wallet,
    pub movements: Vec<(TransactionKind, Movement)>,
}

/// Ban state an accepted request puts the account in
///
/// # Errors
///
/// Returns `MissingBanDuration` for a temporary ban without a positive number
/// of days, and `BanTooLong` when the end of the ban cannot be represented.
pub fn ban_state(
    account: AccountId,
    request: &BanRequest,
    now: DateTime<Utc>,
) -> Result<BanState, WagerError> {
    match request.ban_type {
        BanType::Temporary => {
            let days = request
                .days
                .filter(|days| *days > 0)
                .ok_or(WagerError::MissingBanDuration { account })?;
            let until = now
                .checked_add_signed(Duration::days(i64::from(days)))
                .ok_or(WagerError::BanTooLong { account, days })?;
            Ok(BanState::Temporary {
                until,
                reason: request.reason.clone(),
            })
        }
        BanType::Permanent => Ok(BanState::Permanent {
            reason: request.reason.clone(),
        }),
    }
}

/// Apply the penalty and, for permanent bans, the seizure of what is left
///
/// The penalty uses the normal draw-down but skips the sufficiency check, so
/// it may leave the account in debt. A permanent ban then seizes a positive
/// remainder; debt is left in place.
///
/// # Errors
///
/// Returns an error if the penalty is negative or the debit overflows.
pub fn sanction(
    wallet: Wallet,
    penalty: Decimal,
    ban_type: BanType,
) -> Result<Sanction, WagerError> {
    if penalty < Decimal::ZERO {
        return Err(WagerError::invalid_amount(penalty, "ban penalty"));
    }

    let mut movements = Vec::new();
    let mut wallet = wallet;

    if penalty > Decimal::ZERO {
        let applied = wallet.debit(penalty)?;
        movements.extend(
            applied
                .movements
                .into_iter()
                .map(|m| (TransactionKind::Penalty, m)),
        );
        wallet = applied.wallet;
    }

    if ban_type == BanType::Permanent && wallet.total() > Decimal::ZERO {
        let seized = wallet.seize();
        movements.extend(
            seized
                .movements
                .into_iter()
                .map(|m| (TransactionKind::Forfeiture, m)),
        );
        wallet = seized.wallet;
    }

    Ok(Sanction { wallet, movements })
}
