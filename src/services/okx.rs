use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{
    asset_from_okx, AssetBalance, AssetMovement, Balance, Location, MovementCategory, Trade,
    TradeType,
};
use crate::error::{ImportError, Result};
use crate::infrastructure::{MessageAggregator, Sink};
use crate::services::deserialize::{
    checksum_address, deserialize_amount, deserialize_amount_force_positive, deserialize_price,
    deserialize_timestamp_ms, ts_ms_to_sec,
};
use crate::services::importer::warning_for;

/// One spot order from the venue's trade-history endpoint. Only the fields
/// the mapping consumes are declared; the payload carries many more.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxOrder {
    pub acc_fill_sz: String,
    #[serde(default)]
    pub avg_px: String,
    pub c_time: String,
    pub fee: String,
    pub fee_ccy: String,
    pub inst_id: String,
    pub ord_id: String,
    pub ord_type: String,
    #[serde(default)]
    pub px: String,
    pub side: String,
    pub sz: String,
    #[serde(default)]
    pub tgt_ccy: String,
}

/// One record from the deposit-history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxDeposit {
    pub amt: String,
    pub ccy: String,
    #[serde(default)]
    pub to: String,
    pub ts: String,
    #[serde(default)]
    pub tx_id: String,
}

/// One record from the withdrawal-history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxWithdrawal {
    pub amt: String,
    pub ccy: String,
    pub fee: String,
    #[serde(default)]
    pub fee_ccy: String,
    #[serde(default)]
    pub to: String,
    pub ts: String,
    #[serde(default)]
    pub tx_id: String,
    pub wd_id: String,
}

/// One currency line of the account balance payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxBalanceDetail {
    pub ccy: String,
    pub eq: String,
    pub eq_usd: String,
}

/// Maps one spot order to a canonical trade.
pub fn trade_from_okx_order(raw: &OkxOrder) -> Result<Trade> {
    let legs: Vec<&str> = raw.inst_id.split('-').collect();
    let &[base, quote] = legs.as_slice() else {
        return Err(ImportError::Deserialization(format!(
            "unexpected OKX instrument id '{}'",
            raw.inst_id
        )));
    };
    let base_asset = asset_from_okx(base)?;
    let quote_asset = asset_from_okx(quote)?;
    let timestamp = ts_ms_to_sec(deserialize_timestamp_ms(&raw.c_time)?);
    let trade_type: TradeType = raw.side.parse()?;
    let amount = deserialize_amount(&raw.acc_fill_sz)?;
    let rate = resolve_rate(raw)?;
    // The venue reports fees as negative deductions.
    let fee = deserialize_amount(&raw.fee)?.abs();
    let fee_currency = asset_from_okx(&raw.fee_ccy)?;

    let trade = Trade {
        timestamp,
        location: Location::Okx,
        base_asset,
        quote_asset,
        trade_type,
        amount,
        rate,
        fee,
        fee_currency,
        link: raw.ord_id.clone(),
        notes: None,
    };
    trade.validate()?;
    Ok(trade)
}

/// Prefer the explicit average fill price, then the limit price. Market
/// orders sized in the quote currency report no price at all, but the filled
/// quote/base amounts still yield the effective rate.
fn resolve_rate(raw: &OkxOrder) -> Result<Decimal> {
    if !raw.avg_px.is_empty() {
        return deserialize_price(&raw.avg_px);
    }
    if !raw.px.is_empty() {
        return deserialize_price(&raw.px);
    }
    if raw.ord_type == "market" && raw.tgt_ccy == "quote_ccy" {
        let quote = deserialize_amount(&raw.sz)?;
        let base = deserialize_amount(&raw.acc_fill_sz)?;
        if base > Decimal::ZERO {
            return quote.checked_div(base).ok_or_else(|| {
                ImportError::Deserialization(format!(
                    "rate of OKX order {} is not representable",
                    raw.ord_id
                ))
            });
        }
    }
    Err(ImportError::Deserialization(format!(
        "could not determine a rate for OKX order {}",
        raw.ord_id
    )))
}

/// Maps one deposit record to a canonical movement. Deposits carry no fee
/// field on this venue, so the fee is zero.
pub fn movement_from_okx_deposit(raw: &OkxDeposit) -> Result<AssetMovement> {
    let asset = asset_from_okx(&raw.ccy)?;
    let movement = AssetMovement {
        location: Location::Okx,
        category: MovementCategory::Deposit,
        timestamp: ts_ms_to_sec(deserialize_timestamp_ms(&raw.ts)?),
        address: non_empty(&raw.to).map(checksum_address),
        transaction_id: non_empty(&raw.tx_id).map(str::to_string),
        asset: asset.clone(),
        amount: deserialize_amount_force_positive(&raw.amt)?,
        fee_asset: asset,
        fee: Decimal::ZERO,
        link: raw.tx_id.clone(),
    };
    movement.validate()?;
    Ok(movement)
}

/// Maps one withdrawal record to a canonical movement.
pub fn movement_from_okx_withdrawal(raw: &OkxWithdrawal) -> Result<AssetMovement> {
    let asset = asset_from_okx(&raw.ccy)?;
    let fee_asset = if raw.fee_ccy.is_empty() {
        asset.clone()
    } else {
        asset_from_okx(&raw.fee_ccy)?
    };
    let movement = AssetMovement {
        location: Location::Okx,
        category: MovementCategory::Withdrawal,
        timestamp: ts_ms_to_sec(deserialize_timestamp_ms(&raw.ts)?),
        address: non_empty(&raw.to).map(checksum_address),
        transaction_id: non_empty(&raw.tx_id).map(str::to_string),
        asset,
        amount: deserialize_amount_force_positive(&raw.amt)?,
        fee_asset,
        fee: deserialize_amount(&raw.fee)?.abs(),
        link: raw.tx_id.clone(),
    };
    movement.validate()?;
    Ok(movement)
}

/// Maps one balance line to a canonical asset balance.
pub fn balance_from_okx_detail(raw: &OkxBalanceDetail) -> Result<AssetBalance> {
    Ok(AssetBalance {
        asset: asset_from_okx(&raw.ccy)?,
        balance: Balance {
            amount: deserialize_amount(&raw.eq)?,
            usd_value: deserialize_amount(&raw.eq_usd)?,
        },
    })
}

/// Maps a balance payload, skipping lines the canonical model cannot
/// represent and leaving a warning for each.
pub fn balances_from_okx(
    details: &[OkxBalanceDetail],
    messages: &mut MessageAggregator,
) -> Vec<AssetBalance> {
    let mut balances = Vec::with_capacity(details.len());
    for detail in details {
        match balance_from_okx_detail(detail) {
            Ok(balance) => balances.push(balance),
            Err(e) => {
                warn!("Skipping OKX balance line for {}: {e}", detail.ccy);
                messages.add_warning(warning_for("OKX balance query", &e));
            }
        }
    }
    balances
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Applies the per-record recovery policy over iterators of decoded venue
/// payloads. Pagination and transport belong to the external caller.
pub struct OkxImporter<'a, S: Sink> {
    sink: &'a mut S,
    messages: &'a mut MessageAggregator,
}

impl<'a, S: Sink> OkxImporter<'a, S> {
    pub fn new(sink: &'a mut S, messages: &'a mut MessageAggregator) -> Self {
        Self { sink, messages }
    }

    /// Imports spot orders, returning how many became trades.
    pub fn import_orders<I>(&mut self, orders: I) -> Result<usize>
    where
        I: IntoIterator<Item = OkxOrder>,
    {
        let mut imported = 0usize;
        for order in orders {
            match trade_from_okx_order(&order) {
                Ok(trade) => {
                    self.sink.add_trade(trade);
                    imported += 1;
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping OKX order {}: {e}", order.ord_id);
                    self.messages
                        .add_warning(warning_for("OKX trades query", &e));
                }
                Err(e) => return Err(e),
            }
        }
        info!("OKX order import finished: {imported} trades");
        Ok(imported)
    }

    /// Imports deposit records, returning how many became movements.
    pub fn import_deposits<I>(&mut self, deposits: I) -> Result<usize>
    where
        I: IntoIterator<Item = OkxDeposit>,
    {
        let mut imported = 0usize;
        for deposit in deposits {
            match movement_from_okx_deposit(&deposit) {
                Ok(movement) => {
                    self.sink.add_asset_movement(movement);
                    imported += 1;
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping OKX deposit {}: {e}", deposit.tx_id);
                    self.messages
                        .add_warning(warning_for("OKX deposits query", &e));
                }
                Err(e) => return Err(e),
            }
        }
        info!("OKX deposit import finished: {imported} movements");
        Ok(imported)
    }

    /// Imports withdrawal records, returning how many became movements.
    pub fn import_withdrawals<I>(&mut self, withdrawals: I) -> Result<usize>
    where
        I: IntoIterator<Item = OkxWithdrawal>,
    {
        let mut imported = 0usize;
        for withdrawal in withdrawals {
            match movement_from_okx_withdrawal(&withdrawal) {
                Ok(movement) => {
                    self.sink.add_asset_movement(movement);
                    imported += 1;
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping OKX withdrawal {}: {e}", withdrawal.wd_id);
                    self.messages
                        .add_warning(warning_for("OKX withdrawals query", &e));
                }
                Err(e) => return Err(e),
            }
        }
        info!("OKX withdrawal import finished: {imported} movements");
        Ok(imported)
    }
}
