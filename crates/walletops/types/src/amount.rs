//! Token amounts.
//!
//! Amounts are `u128` counts of the smallest unit (wei). Operators write them
//! as `N` (ether, 10^18), `Ng` (gwei, 10^9) or `NeK` (N * 10^K). `N` may carry
//! a fractional part as long as the exponent covers every fractional digit.

use crate::error::{TypesError, TypesResult};

/// Smallest-unit amount.
pub type Amount = u128;

pub const WEI_PER_GWEI: Amount = 1_000_000_000;
pub const WEI_PER_ETHER: Amount = 1_000_000_000_000_000_000;

/// Parse an amount written in the operator syntax.
pub fn parse_amount(input: &str) -> TypesResult<Amount> {
    let raw = input.trim();
    let invalid = || TypesError::InvalidAmount(input.to_string());

    let (body, exponent) = if let Some(body) = raw.strip_suffix('g') {
        (body, 9u32)
    } else if let Some((body, exp)) = raw.split_once('e') {
        (body, exp.parse::<u32>().map_err(|_| invalid())?)
    } else {
        (raw, 18u32)
    };

    let (whole, fraction) = match body.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (body, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let fraction = fraction.trim_end_matches('0');
    let fraction_len = fraction.len() as u32;
    if fraction_len > exponent {
        return Err(invalid());
    }

    let overflow = || TypesError::AmountOverflow(input.to_string());
    let scale = 10u128.checked_pow(exponent).ok_or_else(overflow)?;
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let mut value = whole_value.checked_mul(scale).ok_or_else(overflow)?;

    if !fraction.is_empty() {
        let fraction_value = fraction.parse::<u128>().map_err(|_| overflow())?;
        let fraction_scale = 10u128
            .checked_pow(exponent - fraction_len)
            .ok_or_else(overflow)?;
        value = fraction_value
            .checked_mul(fraction_scale)
            .and_then(|f| value.checked_add(f))
            .ok_or_else(overflow)?;
    }

    Ok(value)
}

/// Render a wei amount as a decimal ether string without trailing zeros.
pub fn format_amount(amount: Amount) -> String {
    let whole = amount / WEI_PER_ETHER;
    let fraction = amount % WEI_PER_ETHER;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:018}", fraction);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Serde adapter persisting an optional amount as a decimal string.
///
/// JSON numbers lose precision past 2^53 in most readers, so amounts are
/// stored as strings.
pub mod serde_opt_amount {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| s.parse::<u128>().map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_is_ether() {
        assert_eq!(parse_amount("9").unwrap(), 9 * WEI_PER_ETHER);
        assert_eq!(parse_amount("0.5").unwrap(), WEI_PER_ETHER / 2);
    }

    #[test]
    fn gwei_suffix() {
        assert_eq!(parse_amount("9g").unwrap(), 9 * WEI_PER_GWEI);
        assert_eq!(parse_amount("1.5g").unwrap(), 1_500_000_000);
    }

    #[test]
    fn explicit_exponent() {
        assert_eq!(parse_amount("9e3").unwrap(), 9000);
        assert_eq!(parse_amount("9e0").unwrap(), 9);
        assert_eq!(parse_amount("1.25e2").unwrap(), 125);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("1.5e0").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1ex").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(matches!(
            parse_amount("1e60"),
            Err(TypesError::AmountOverflow(_))
        ));
    }

    #[test]
    fn formats_ether() {
        assert_eq!(format_amount(3 * WEI_PER_ETHER), "3");
        assert_eq!(format_amount(WEI_PER_ETHER + WEI_PER_ETHER / 4), "1.25");
        assert_eq!(format_amount(1), "0.000000000000000001");
    }
}
