use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{asset_from_poloniex, Location, Trade, TradeType};
use crate::error::{ImportError, Result};
use crate::infrastructure::{MessageAggregator, Sink};
use crate::services::deserialize::{
    deserialize_amount, deserialize_fee, deserialize_price, deserialize_timestamp_from_date,
    ISO8601_FORMAT,
};
use crate::services::importer::{CsvImport, CsvRow};

/// Imports Poloniex trade-ledger CSV exports. Only rows of the `Exchange`
/// category are trades; everything else the venue mixes into the file is
/// surfaced as unsupported.
pub struct PoloniexImporter<'a, S: Sink> {
    sink: &'a mut S,
    messages: &'a mut MessageAggregator,
    timestamp_format: String,
}

impl<'a, S: Sink> PoloniexImporter<'a, S> {
    pub fn new(sink: &'a mut S, messages: &'a mut MessageAggregator) -> Self {
        Self {
            sink,
            messages,
            timestamp_format: ISO8601_FORMAT.to_string(),
        }
    }

    /// Overrides the timestamp format, for exports produced with localized
    /// date settings.
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }
}

/// Maps one trade-ledger row to a canonical trade.
///
/// `Market` is `BASE/QUOTE`, `Price` is quote per base and `Amount` the base
/// amount. `Fee Total`/`Fee Currency` travel as a pair: both absent means a
/// zero fee in the quote asset, only one present is a malformed row.
pub fn trade_from_poloniex(row: &CsvRow, timestamp_format: &str) -> Result<Trade> {
    let timestamp = deserialize_timestamp_from_date(row.get("Date")?, timestamp_format)?;
    let market = row.get("Market")?;
    let (base, quote) = market.split_once('/').ok_or_else(|| {
        ImportError::Deserialization(format!("could not split market pair '{market}'"))
    })?;
    let base_asset = asset_from_poloniex(base)?;
    let quote_asset = asset_from_poloniex(quote)?;
    let trade_type: TradeType = row.get("Type")?.parse()?;
    let rate = deserialize_price(row.get("Price")?)?;
    let amount = deserialize_amount(row.get("Amount")?)?;
    let (fee, fee_currency) = match (row.opt("Fee Total"), row.opt("Fee Currency")) {
        (Some(fee), Some(currency)) => (deserialize_fee(fee)?, asset_from_poloniex(currency)?),
        (None, None) => (Decimal::ZERO, quote_asset.clone()),
        _ => {
            return Err(ImportError::Deserialization(
                "row reports only one of 'Fee Total' and 'Fee Currency'".to_string(),
            ))
        }
    };

    let trade = Trade {
        timestamp,
        location: Location::Poloniex,
        base_asset,
        quote_asset,
        trade_type,
        amount,
        rate,
        fee,
        fee_currency,
        link: row.get("Order Number")?.to_string(),
        notes: None,
    };
    trade.validate()?;
    Ok(trade)
}

impl<'a, S: Sink> CsvImport for PoloniexImporter<'a, S> {
    fn location(&self) -> Location {
        Location::Poloniex
    }

    fn messages(&mut self) -> &mut MessageAggregator {
        self.messages
    }

    fn consume_row(&mut self, row: &CsvRow) -> Result<()> {
        let category = row.get("Category")?;
        if category != "Exchange" {
            return Err(ImportError::UnsupportedEntry(format!("category {category}")));
        }
        let trade = trade_from_poloniex(row, &self.timestamp_format)?;
        debug!(
            "Processing Poloniex {} of {} {}",
            trade.trade_type, trade.amount, trade.base_asset
        );
        self.sink.add_trade(trade);
        Ok(())
    }
}
