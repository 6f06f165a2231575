use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{
    Asset, AssetMovement, Balance, HistoryEvent, HistoryEventSubType, HistoryEventType, Location,
    MarginPosition, MovementCategory,
};
use crate::error::{ImportError, Result};
use crate::infrastructure::{MessageAggregator, PriceOracle, Sink};
use crate::services::deserialize::{
    deserialize_amount, deserialize_amount_force_positive, deserialize_fee,
    deserialize_timestamp_from_date, satoshis_to_unit, ts_sec_to_ms,
};
use crate::services::importer::{CsvImport, CsvRow};

/// Event identifier prefix for rows of this venue.
const EVENT_PREFIX: &str = "BMEX_";

/// Wallet-history exports date rows with a 12-hour clock.
const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

/// Imports BitMEX wallet-history CSV exports.
///
/// The whole file denominates in XBt (satoshis). RealisedPNL rows become a
/// MarginPosition plus a HistoryEvent batched until end of file; Deposit and
/// Withdrawal rows become AssetMovements.
pub struct BitmexImporter<'a, S: Sink> {
    sink: &'a mut S,
    oracle: &'a dyn PriceOracle,
    messages: &'a mut MessageAggregator,
    timestamp_format: String,
    pending_events: Vec<HistoryEvent>,
}

impl<'a, S: Sink> BitmexImporter<'a, S> {
    pub fn new(
        sink: &'a mut S,
        oracle: &'a dyn PriceOracle,
        messages: &'a mut MessageAggregator,
    ) -> Self {
        Self {
            sink,
            oracle,
            messages,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            pending_events: Vec::new(),
        }
    }

    /// Overrides the timestamp format, for exports produced with localized
    /// date settings.
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    fn consume_realised_pnl(&mut self, row: &CsvRow) -> Result<()> {
        let close_time =
            deserialize_timestamp_from_date(row.get("transactTime")?, &self.timestamp_format)?;
        let profit_loss = satoshis_to_unit(deserialize_amount(row.get("amount")?)?);
        let fee = satoshis_to_unit(deserialize_fee(row.get("fee")?)?);
        let notes = format!("PnL from trade on {}", row.get("address")?);
        debug!("Processing BitMEX realized PnL of {profit_loss} BTC at {close_time}");

        let usd_price = self
            .oracle
            .query_historical_price(&Asset::BTC, &Asset::USD, close_time)?;
        let abs_amount = profit_loss.abs();
        let usd_value = usd_price.checked_mul(abs_amount).ok_or_else(|| {
            ImportError::Deserialization(format!(
                "USD value of {abs_amount} BTC overflows at price {usd_price}"
            ))
        })?;
        let event_subtype = if profit_loss < Decimal::ZERO {
            HistoryEventSubType::Spend
        } else {
            HistoryEventSubType::Receive
        };

        let position = MarginPosition {
            location: Location::Bitmex,
            open_time: None,
            close_time,
            profit_loss,
            pl_currency: Asset::BTC,
            fee,
            fee_currency: Asset::BTC,
            notes: notes.clone(),
            link: provenance_link(row.get("transactType")?),
        };
        let event = HistoryEvent {
            event_identifier: format!("{EVENT_PREFIX}{}", row.content_hash()),
            sequence_index: 0,
            timestamp: ts_sec_to_ms(close_time),
            location: Location::Bitmex,
            asset: Asset::BTC,
            balance: Balance {
                amount: abs_amount,
                usd_value,
            },
            notes,
            event_type: HistoryEventType::Margin,
            event_subtype,
        };

        self.sink.add_margin_trade(position);
        self.pending_events.push(event);
        Ok(())
    }

    fn consume_deposit_or_withdrawal(
        &mut self,
        row: &CsvRow,
        category: MovementCategory,
    ) -> Result<()> {
        let timestamp =
            deserialize_timestamp_from_date(row.get("transactTime")?, &self.timestamp_format)?;
        let amount = satoshis_to_unit(deserialize_amount_force_positive(row.get("amount")?)?);
        let fee = satoshis_to_unit(deserialize_fee(row.get("fee")?)?);
        debug!("Processing BitMEX {category} of {amount} BTC at {timestamp}");

        let movement = AssetMovement {
            location: Location::Bitmex,
            category,
            timestamp,
            address: row.opt("address").map(str::to_string),
            transaction_id: row.opt("tx").map(str::to_string),
            asset: Asset::BTC,
            amount,
            fee_asset: Asset::BTC,
            fee,
            link: provenance_link(row.get("transactType")?),
        };
        movement.validate()?;
        self.sink.add_asset_movement(movement);
        Ok(())
    }
}

fn provenance_link(transact_type: &str) -> String {
    format!("Imported from BitMEX CSV file. Transact Type: {transact_type}")
}

impl<'a, S: Sink> CsvImport for BitmexImporter<'a, S> {
    fn location(&self) -> Location {
        Location::Bitmex
    }

    fn messages(&mut self) -> &mut MessageAggregator {
        self.messages
    }

    fn consume_row(&mut self, row: &CsvRow) -> Result<()> {
        match row.get("transactType")? {
            "RealisedPNL" => self.consume_realised_pnl(row),
            "Deposit" => self.consume_deposit_or_withdrawal(row, MovementCategory::Deposit),
            "Withdrawal" => self.consume_deposit_or_withdrawal(row, MovementCategory::Withdrawal),
            other => Err(ImportError::UnsupportedEntry(format!(
                "transactType {other}"
            ))),
        }
    }

    fn flush(&mut self) {
        if self.pending_events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending_events);
        debug!("Flushing {} batched BitMEX history events", events.len());
        self.sink.add_history_events(events);
    }
}
