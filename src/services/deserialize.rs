use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use sha3::{Digest, Keccak256};

use crate::error::{ImportError, Result};

/// Timestamp format sentinel accepting RFC 3339 plus the date-time shapes
/// venues commonly emit without a zone marker.
pub const ISO8601_FORMAT: &str = "iso8601";

/// Parses a decimal amount. Venues report numbers as strings, and balance
/// payloads occasionally use scientific notation.
pub fn deserialize_amount(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ImportError::Deserialization(
            "empty amount value".to_string(),
        ));
    }
    Decimal::from_str_exact(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ImportError::Deserialization(format!("failed to deserialize amount '{trimmed}'")))
}

/// Parses an amount whose direction is carried elsewhere, coercing the value
/// to a positive magnitude.
pub fn deserialize_amount_force_positive(value: &str) -> Result<Decimal> {
    deserialize_amount(value).map(|amount| amount.abs())
}

/// Parses a fee field. Venues omit the fee where none applies, so an empty
/// value means zero; a negative value is malformed.
pub fn deserialize_fee(value: &str) -> Result<Decimal> {
    if value.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    let fee = deserialize_amount(value)?;
    if fee < Decimal::ZERO {
        return Err(ImportError::Deserialization(format!(
            "fee '{fee}' is negative"
        )));
    }
    Ok(fee)
}

/// Parses a price, which must be strictly positive.
pub fn deserialize_price(value: &str) -> Result<Decimal> {
    let price = deserialize_amount(value)?;
    if price <= Decimal::ZERO {
        return Err(ImportError::Deserialization(format!(
            "price '{price}' is not positive"
        )));
    }
    Ok(price)
}

/// Parses a date string into epoch seconds using the venue's format string,
/// or the [`ISO8601_FORMAT`] sentinel. Naive datetimes are taken as UTC.
pub fn deserialize_timestamp_from_date(value: &str, format: &str) -> Result<i64> {
    let trimmed = value.trim();
    if format == ISO8601_FORMAT {
        return parse_iso8601(trimmed);
    }
    NaiveDateTime::parse_from_str(trimmed, format)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|e| {
            ImportError::Deserialization(format!(
                "failed to parse timestamp '{trimmed}' with format '{format}': {e}"
            ))
        })
}

fn parse_iso8601(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp())
        })
        .map_err(|_| {
            ImportError::Deserialization(format!(
                "failed to parse timestamp '{value}' as ISO 8601"
            ))
        })
}

/// Parses an epoch-milliseconds value reported as a decimal string.
pub fn deserialize_timestamp_ms(value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        ImportError::Deserialization(format!(
            "failed to deserialize millisecond timestamp '{value}'"
        ))
    })
}

pub fn ts_ms_to_sec(ms: i64) -> i64 {
    ms / 1000
}

pub fn ts_sec_to_ms(sec: i64) -> i64 {
    sec * 1000
}

/// Scales a satoshi-denominated value to whole units. Multiplying by 1e-8
/// only shifts the scale, so the conversion is exact.
pub fn satoshis_to_unit(amount: Decimal) -> Decimal {
    amount * Decimal::new(1, 8)
}

/// Normalizes an EVM address to its EIP-55 mixed-case checksum form.
///
/// Anything that does not look like a 0x-prefixed 20-byte hex address
/// (Solana base58, bank references) passes through unchanged.
pub fn checksum_address(address: &str) -> String {
    let Some(body) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return address.to_string();
    };
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return address.to_string();
    }
    let lower = body.to_ascii_lowercase();
    let digest = Keccak256::digest(lower.as_bytes());
    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, ch) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if nibble >= 8 {
            checksummed.push(ch.to_ascii_uppercase());
        } else {
            checksummed.push(ch);
        }
    }
    checksummed
}
