use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::Asset;
use crate::error::{ImportError, Result};

/// Source of historical prices, used to backfill USD valuations on records
/// whose source rows carry none.
pub trait PriceOracle {
    /// Price of one unit of `base` in `quote` at `timestamp` (epoch seconds).
    fn query_historical_price(&self, base: &Asset, quote: &Asset, timestamp: i64) -> Result<Decimal>;
}

/// Fixed per-pair price table. A deterministic stand-in for a real price
/// feed in tests and dry runs.
#[derive(Debug, Default)]
pub struct FixedPriceOracle {
    prices: HashMap<(Asset, Asset), Decimal>,
}

impl FixedPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, base: Asset, quote: Asset, price: Decimal) -> Self {
        self.prices.insert((base, quote), price);
        self
    }
}

impl PriceOracle for FixedPriceOracle {
    fn query_historical_price(&self, base: &Asset, quote: &Asset, timestamp: i64) -> Result<Decimal> {
        self.prices
            .get(&(base.clone(), quote.clone()))
            .copied()
            .ok_or_else(|| ImportError::NoPriceForAsset {
                asset: base.symbol().to_string(),
                quote: quote.symbol().to_string(),
                timestamp,
            })
    }
}
