use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Asset, Location};

/// An asset amount together with its USD valuation at event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Decimal,
    pub usd_value: Decimal,
}

/// One line of a venue account balance snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: Asset,
    pub balance: Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventType {
    Trade,
    Deposit,
    Withdrawal,
    Margin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventSubType {
    Spend,
    Receive,
}

/// A dated ledger event carried outside the trade and movement tables, e.g.
/// the realized-PnL side of a margin settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Venue prefix plus a deterministic digest of the source row, so
    /// re-importing the same file reproduces the same identifier.
    pub event_identifier: String,
    /// Orders events that share an identifier.
    pub sequence_index: u32,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub location: Location,
    pub asset: Asset,
    pub balance: Balance,
    pub notes: String,
    pub event_type: HistoryEventType,
    pub event_subtype: HistoryEventSubType,
}

impl HistoryEvent {
    /// Dedup key: events are unique per (identifier, sequence index).
    pub fn dedup_key(&self) -> String {
        format!("{}-{}", self.event_identifier, self.sequence_index)
    }
}
