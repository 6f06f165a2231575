use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::Asset;
use crate::error::{ImportError, Result};

/// Venue a record was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Bitmex,
    Poloniex,
    Okx,
}

impl Location {
    /// Venue name as written in warnings and log lines.
    pub fn venue_name(&self) -> &'static str {
        match self {
            Location::Bitmex => "BitMEX",
            Location::Poloniex => "Poloniex",
            Location::Okx => "OKX",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Location::Bitmex => "bitmex",
            Location::Poloniex => "poloniex",
            Location::Okx => "okx",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => f.write_str("buy"),
            TradeType::Sell => f.write_str("sell"),
        }
    }
}

impl FromStr for TradeType {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(ImportError::Deserialization(format!(
                "unknown trade type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementCategory {
    Deposit,
    Withdrawal,
}

impl fmt::Display for MovementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementCategory::Deposit => f.write_str("deposit"),
            MovementCategory::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// A spot trade normalized from venue data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Epoch seconds.
    pub timestamp: i64,
    pub location: Location,
    pub base_asset: Asset,
    pub quote_asset: Asset,
    pub trade_type: TradeType,
    pub amount: Decimal,
    /// Price of one unit of base in quote.
    pub rate: Decimal,
    pub fee: Decimal,
    pub fee_currency: Asset,
    /// Venue-native order or trade id.
    pub link: String,
    pub notes: Option<String>,
}

impl Trade {
    /// Checks the record invariants. Called right after construction; a
    /// violation means the source value was malformed.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(ImportError::Deserialization(format!(
                "trade amount '{}' is not positive",
                self.amount
            )));
        }
        if self.rate <= Decimal::ZERO {
            return Err(ImportError::Deserialization(format!(
                "trade rate '{}' is not positive",
                self.rate
            )));
        }
        if self.fee < Decimal::ZERO {
            return Err(ImportError::Deserialization(format!(
                "trade fee '{}' is negative",
                self.fee
            )));
        }
        Ok(())
    }

    /// Stable identity used by sinks for dedup.
    pub fn identifier(&self) -> String {
        digest_fields(&[
            &self.location.to_string(),
            &self.timestamp.to_string(),
            self.base_asset.symbol(),
            self.quote_asset.symbol(),
            &self.trade_type.to_string(),
            &self.amount.to_string(),
            &self.rate.to_string(),
            &self.link,
        ])
    }
}

/// A deposit to or withdrawal from a venue account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMovement {
    pub location: Location,
    pub category: MovementCategory,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Destination/source chain address, case-normalized.
    pub address: Option<String>,
    /// On-chain transaction hash, when the venue reports one.
    pub transaction_id: Option<String>,
    pub asset: Asset,
    pub amount: Decimal,
    pub fee_asset: Asset,
    pub fee: Decimal,
    pub link: String,
}

impl AssetMovement {
    /// Direction is carried by the category, so the amount must be a
    /// positive magnitude and the fee non-negative.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(ImportError::Deserialization(format!(
                "movement amount '{}' is not positive",
                self.amount
            )));
        }
        if self.fee < Decimal::ZERO {
            return Err(ImportError::Deserialization(format!(
                "movement fee '{}' is negative",
                self.fee
            )));
        }
        Ok(())
    }

    /// Stable identity used by sinks for dedup.
    pub fn identifier(&self) -> String {
        digest_fields(&[
            &self.location.to_string(),
            &self.category.to_string(),
            &self.timestamp.to_string(),
            self.asset.symbol(),
            &self.amount.to_string(),
            self.transaction_id.as_deref().unwrap_or(""),
            &self.link,
        ])
    }
}

/// A closed margin trading result. Some venues only report the realized
/// outcome, so the open time may be unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginPosition {
    pub location: Location,
    /// Epoch seconds; None when the source reports no open data.
    pub open_time: Option<i64>,
    /// Epoch seconds.
    pub close_time: i64,
    /// Signed: negative is a loss.
    pub profit_loss: Decimal,
    pub pl_currency: Asset,
    pub fee: Decimal,
    pub fee_currency: Asset,
    pub notes: String,
    pub link: String,
}

impl MarginPosition {
    /// Stable identity used by sinks for dedup.
    pub fn identifier(&self) -> String {
        digest_fields(&[
            &self.location.to_string(),
            &self.open_time.map(|t| t.to_string()).unwrap_or_default(),
            &self.close_time.to_string(),
            &self.profit_loss.to_string(),
            self.pl_currency.symbol(),
            &self.notes,
            &self.link,
        ])
    }
}

fn digest_fields(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize())
}
