use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// Canonical asset identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(Cow<'static, str>);

impl Asset {
    pub const BTC: Asset = Asset(Cow::Borrowed("BTC"));
    pub const ETH: Asset = Asset(Cow::Borrowed("ETH"));
    pub const SOL: Asset = Asset(Cow::Borrowed("SOL"));
    pub const USD: Asset = Asset(Cow::Borrowed("USD"));
    pub const USDC: Asset = Asset(Cow::Borrowed("USDC"));
    pub const USDT: Asset = Asset(Cow::Borrowed("USDT"));

    pub fn new(symbol: impl Into<String>) -> Self {
        Asset(Cow::Owned(symbol.into()))
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbols the canonical model recognizes. Venue converters reject anything
/// outside this set as an unknown asset. Sorted for binary search.
const KNOWN_ASSETS: &[&str] = &[
    "ADA", "ATOM", "AVAX", "BCH", "BNB", "BSV", "BTC", "DOGE", "DOT", "ETC", "ETH", "EUR", "LINK",
    "LTC", "MATIC", "SOL", "TRX", "UNI", "USD", "USDC", "USDT", "XLM", "XMR", "XRP",
];

/// Leveraged tokens OKX lists as plain currencies. They are venue products,
/// not assets, and cannot be represented in the canonical model.
const UNSUPPORTED_OKX_ASSETS: &[&str] = &["BTC3L", "BTC3S", "ETH3L", "ETH3S"];

/// Legacy Poloniex tickers whose canonical symbol differs.
const POLONIEX_RENAMES: &[(&str, &str)] = &[("BCHABC", "BCH"), ("BCHSV", "BSV"), ("STR", "XLM")];

/// Tickers delisted from Poloniex that never made it into the canonical set.
const UNSUPPORTED_POLONIEX_ASSETS: &[&str] = &["BBR", "C2", "NOBL", "QORA", "UNITY"];

/// Resolves an OKX currency code to a canonical asset.
pub fn asset_from_okx(symbol: &str) -> Result<Asset> {
    resolve_venue_symbol(symbol, &[], UNSUPPORTED_OKX_ASSETS)
}

/// Resolves a Poloniex ticker to a canonical asset, applying legacy renames.
pub fn asset_from_poloniex(symbol: &str) -> Result<Asset> {
    resolve_venue_symbol(symbol, POLONIEX_RENAMES, UNSUPPORTED_POLONIEX_ASSETS)
}

fn resolve_venue_symbol(
    symbol: &str,
    renames: &[(&str, &str)],
    unsupported: &[&str],
) -> Result<Asset> {
    let upper = symbol.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(ImportError::Deserialization(
            "empty asset symbol".to_string(),
        ));
    }
    if unsupported.contains(&upper.as_str()) {
        return Err(ImportError::UnsupportedAsset(symbol.to_string()));
    }
    let canonical = renames
        .iter()
        .find(|(venue, _)| *venue == upper)
        .map_or(upper.as_str(), |&(_, canonical)| canonical);
    if KNOWN_ASSETS.binary_search(&canonical).is_ok() {
        Ok(Asset::new(canonical))
    } else {
        Err(ImportError::UnknownAsset(symbol.to_string()))
    }
}
