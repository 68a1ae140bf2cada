//! CSV format handling for journal records and engine output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to journal records
//! - Account and ledger output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Journal columns
//!
//! `at,command,actor,subject,ref,amount,option,days,note,code,password`
//!
//! Only `at` and `command` are always required. `actor` is the account issuing
//! the command (the account being registered for `register` and
//! `grant-admin`); the other columns are read per command.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

use crate::types::{
    Account, AccountId, BanRequest, BanType, JournalAction, JournalRecord, MatchType, Role,
    Transaction,
};

/// Raw journal line as it appears in the CSV file
///
/// Every column except `at` and `command` is optional: trailing columns may
/// be left out of a row entirely.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    pub at: String,
    pub command: String,
    pub actor: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub amount: Option<String>,
    pub option: Option<String>,
    pub days: Option<String>,
    pub note: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
}

/// Convert a raw CSV record into a journal record
///
/// # Errors
///
/// Returns a descriptive message if the command is unknown, a column the
/// command needs is missing, or a value does not parse.
pub fn convert_csv_record(csv_record: CsvRecord, line: u64) -> Result<JournalRecord, String> {
    let at = DateTime::parse_from_rfc3339(csv_record.at.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", csv_record.at, e))?;

    let command = csv_record.command.trim().to_lowercase();
    let record = &csv_record;
    let actor = || parse_account(&record.actor, "actor", &command);
    let subject = || parse_account(&record.subject, "subject", &command);
    let reference = || required(&record.reference, "ref", &command).map(str::to_string);

    let action = match command.as_str() {
        "register" => JournalAction::Register {
            account: actor()?,
            role: match optional(&record.option) {
                Some(role) => Role::from_str(&role)?,
                None => Role::Player,
            },
        },
        "grant-admin" => JournalAction::GrantAdmin { account: actor()? },
        "deposit" => JournalAction::Deposit {
            actor: actor()?,
            amount: amount(&record.amount, &command)?,
            external_ref: text(&record.note),
        },
        "withdraw" => JournalAction::Withdraw {
            actor: actor()?,
            amount: amount(&record.amount, &command)?,
            reference: optional(&record.reference),
        },
        "approve" => JournalAction::Approve {
            admin: actor()?,
            reference: reference()?,
        },
        "reject" => JournalAction::Reject {
            admin: actor()?,
            reference: reference()?,
            reason: text(&record.note),
        },
        "create" => JournalAction::Create {
            actor: actor()?,
            reference: reference()?,
            room_code: text(&record.code),
            password: text(&record.password),
            match_type: MatchType::from_str(required(&record.option, "option", &command)?)?,
            stake: amount(&record.amount, &command)?,
        },
        "join" => JournalAction::Join {
            actor: actor()?,
            reference: reference()?,
        },
        "cancel" => JournalAction::Cancel {
            actor: actor()?,
            reference: reference()?,
        },
        "result" => JournalAction::Result {
            actor: actor()?,
            reference: reference()?,
            evidence_ref: text(&record.note),
        },
        "dispute" => JournalAction::Dispute {
            actor: actor()?,
            reference: reference()?,
            reason: text(&record.note),
            evidence_ref: optional(&record.code),
        },
        "declare" => JournalAction::Declare {
            admin: actor()?,
            reference: reference()?,
            winner: subject()?,
            notes: optional(&record.note),
        },
        "expire" => JournalAction::Expire {
            admin: actor()?,
            reference: reference()?,
        },
        "ban" => JournalAction::Ban {
            admin: actor()?,
            account: subject()?,
            ban: BanRequest {
                ban_type: BanType::from_str(required(&record.option, "option", &command)?)?,
                reason: text(&record.note),
                days: days(&record.days)?,
            },
            penalty: match optional(&record.amount) {
                Some(_) => amount(&record.amount, &command)?,
                None => Decimal::ZERO,
            },
        },
        "unban" => JournalAction::Unban {
            admin: actor()?,
            account: subject()?,
        },
        _ => return Err(format!("Invalid command '{}'", csv_record.command)),
    };

    Ok(JournalRecord { line, at, action })
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn text(value: &Option<String>) -> String {
    optional(value).unwrap_or_default()
}

fn required<'a>(value: &'a Option<String>, column: &str, command: &str) -> Result<&'a str, String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("'{}' requires the '{}' column", command, column))
}

fn parse_account(value: &Option<String>, column: &str, command: &str) -> Result<AccountId, String> {
    let raw = required(value, column, command)?;
    raw.parse::<AccountId>()
        .map_err(|_| format!("Invalid {} '{}' for '{}'", column, raw, command))
}

fn amount(value: &Option<String>, command: &str) -> Result<Decimal, String> {
    let raw = required(value, "amount", command)?;
    Decimal::from_str(raw).map_err(|_| format!("Invalid amount '{}' for '{}'", raw, command))
}

fn days(value: &Option<String>) -> Result<Option<u32>, String> {
    optional(value)
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| format!("Invalid days '{}'", raw))
        })
        .transpose()
}

/// Write accounts as CSV, ordered by account id
///
/// Balances are written with two decimal places.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "deposit", "winning", "total", "banned"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                format!("{:.2}", account.wallet.deposit_balance),
                format!("{:.2}", account.wallet.winning_balance),
                format!("{:.2}", account.wallet.total()),
                account.ban.is_banned().to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger entries as CSV in recording order
pub fn write_ledger_csv(entries: &[Transaction], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "id",
            "account",
            "kind",
            "amount",
            "bucket",
            "room",
            "status",
            "audit_only",
            "description",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_entries = entries.to_vec();
    sorted_entries.sort_by_key(|entry| entry.id);

    for entry in sorted_entries {
        writer
            .write_record(&[
                entry.id.to_string(),
                entry.account.to_string(),
                entry.kind.to_string(),
                format!("{:.2}", entry.amount),
                entry.bucket.to_string(),
                entry.room.map(|room| room.to_string()).unwrap_or_default(),
                entry.status.to_string(),
                entry.audit_only.to_string(),
                entry.description.clone(),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
