//! Canonical OCC contract symbols.
//!
//! Canonical form: `ROOT + YYMMDD + (P|C) + strike*1000` zero-padded to 8
//! digits, with no space padding. Provider responses may space-pad the root
//! to six characters; both variants normalize to the same key.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use wheel_scan_core::{OptionRight, ScanError};

/// Parsed components of a contract symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccSymbol {
    pub root: String,
    pub expiration: NaiveDate,
    pub right: OptionRight,
    pub strike: Decimal,
}

/// Builds the canonical symbol for a contract.
///
/// # Errors
///
/// `Validation` when the root is empty/non-alphanumeric or the strike does
/// not fit the 8-digit milli-dollar field.
pub fn build_occ_symbol(
    root: &str,
    expiration: NaiveDate,
    right: OptionRight,
    strike: Decimal,
) -> Result<String, ScanError> {
    let root = root.trim().to_uppercase();
    if root.is_empty() || !root.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ScanError::Validation(format!(
            "invalid option root: {root:?}"
        )));
    }

    let millis = (strike * Decimal::from(1000)).round();
    let millis = millis
        .to_i64()
        .filter(|&m| (0..=99_999_999).contains(&m))
        .ok_or_else(|| ScanError::Validation(format!("strike out of range: {strike}")))?;

    Ok(format!(
        "{root}{:02}{:02}{:02}{right}{millis:08}",
        expiration.year() % 100,
        expiration.month(),
        expiration.day(),
    ))
}

/// Parses a canonical or space-padded contract symbol.
///
/// # Errors
///
/// `Validation` when the input is not a contract symbol, notably when a
/// caller passes a bare underlying ticker.
pub fn parse_occ_symbol(s: &str) -> Result<OccSymbol, ScanError> {
    let s = s.trim();
    if s.len() < 16 {
        return Err(ScanError::Validation(format!(
            "not a contract symbol (expected ROOT+YYMMDD+P/C+8-digit strike): {s:?}"
        )));
    }

    let (head, tail) = s.split_at(s.len() - 15);
    let root = head.trim_end().to_uppercase();
    if root.is_empty() || !root.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ScanError::Validation(format!(
            "invalid option root in symbol: {s:?}"
        )));
    }

    let (date_str, rest) = tail.split_at(6);
    let (right_str, strike_str) = rest.split_at(1);

    if !date_str.chars().all(|c| c.is_ascii_digit())
        || !strike_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ScanError::Validation(format!(
            "malformed contract symbol: {s:?}"
        )));
    }

    let yy: i32 = date_str[0..2].parse().unwrap_or(0);
    let mm: u32 = date_str[2..4].parse().unwrap_or(0);
    let dd: u32 = date_str[4..6].parse().unwrap_or(0);
    let expiration = NaiveDate::from_ymd_opt(2000 + yy, mm, dd)
        .ok_or_else(|| ScanError::Validation(format!("invalid expiration in symbol: {s:?}")))?;

    let right = match right_str {
        "P" | "p" => OptionRight::Put,
        "C" | "c" => OptionRight::Call,
        _ => {
            return Err(ScanError::Validation(format!(
                "invalid right in symbol: {s:?}"
            )))
        }
    };

    let millis: i64 = strike_str
        .parse()
        .map_err(|_| ScanError::Validation(format!("invalid strike in symbol: {s:?}")))?;
    let strike = Decimal::from(millis) / Decimal::from(1000);

    Ok(OccSymbol {
        root,
        expiration,
        right,
        strike,
    })
}

/// Normalizes any accepted variant to the canonical form.
///
/// # Errors
///
/// `Validation` when the input does not parse as a contract symbol.
pub fn normalize_occ_symbol(s: &str) -> Result<String, ScanError> {
    let parts = parse_occ_symbol(s)?;
    build_occ_symbol(&parts.root, parts.expiration, parts.right, parts.strike)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn builds_canonical_symbol_with_zero_padding() {
        let sym = build_occ_symbol(
            "AAPL",
            NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
            OptionRight::Put,
            dec!(150),
        )
        .unwrap();
        assert_eq!(sym, "AAPL260116P00150000");
    }

    #[test]
    fn builds_fractional_strike() {
        let sym = build_occ_symbol(
            "F",
            NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            OptionRight::Call,
            dec!(12.5),
        )
        .unwrap();
        assert_eq!(sym, "F260320C00012500");
    }

    #[test]
    fn parse_round_trips_canonical_form() {
        let sym = "MSFT260220C00420000";
        let parts = parse_occ_symbol(sym).unwrap();
        assert_eq!(parts.root, "MSFT");
        assert_eq!(parts.expiration, NaiveDate::from_ymd_opt(2026, 2, 20).unwrap());
        assert_eq!(parts.right, OptionRight::Call);
        assert_eq!(parts.strike, dec!(420));
        let rebuilt =
            build_occ_symbol(&parts.root, parts.expiration, parts.right, parts.strike).unwrap();
        assert_eq!(rebuilt, sym);
    }

    #[test]
    fn space_padded_and_unpadded_normalize_identically() {
        let padded = "AAPL  260116P00150000";
        let unpadded = "AAPL260116P00150000";
        assert_eq!(
            normalize_occ_symbol(padded).unwrap(),
            normalize_occ_symbol(unpadded).unwrap()
        );
        assert_eq!(normalize_occ_symbol(padded).unwrap(), unpadded);
    }

    #[test]
    fn normalize_is_idempotent() {
        let s = "SPY  251219P00450000";
        let once = normalize_occ_symbol(s).unwrap();
        let twice = normalize_occ_symbol(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn bare_ticker_is_a_validation_error() {
        let err = parse_occ_symbol("AAPL").unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
    }

    #[test]
    fn garbage_tail_is_rejected() {
        assert!(parse_occ_symbol("AAPL260116X00150000").is_err());
        assert!(parse_occ_symbol("AAPL2601ABP00150000").is_err());
    }

    #[test]
    fn invalid_expiration_is_rejected() {
        assert!(parse_occ_symbol("AAPL261345P00150000").is_err());
    }

    #[test]
    fn oversized_strike_is_rejected_on_build() {
        let err = build_occ_symbol(
            "AAPL",
            NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
            OptionRight::Put,
            dec!(100000),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
    }
}
