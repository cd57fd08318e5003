use alloy_primitives::U256;

use super::PricingError;

/// `"0.1"` with 18 decimals → `100000000000000000`
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, PricingError> {
    let amount = amount.trim();
    let invalid = || PricingError::InvalidAmount(amount.to_string());

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > usize::from(decimals) {
        return Err(PricingError::InvalidAmount(format!(
            "{amount} has more than {decimals} decimal places"
        )));
    }

    let digits = format!("{whole}{fraction:0<width$}", width = usize::from(decimals));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid())
}

/// Inverse of [`parse_units`]; keeps at least one fractional digit (`1.0`)
pub fn format_units(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return format!("{raw}.0");
    }

    let padded = format!("{raw:0>width$}", width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(parse_units("0.1", 18).unwrap(), U256::from(100_000_000_000_000_000u64));
        assert_eq!(parse_units("25", 6).unwrap(), U256::from(25_000_000u64));
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(parse_units("0", 6).unwrap(), U256::ZERO);
        assert!(parse_units("1.1234567", 6).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
        assert!(parse_units(".", 18).is_err());
    }

    #[test]
    fn formats_with_trimmed_fraction() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1.0");
        assert_eq!(format_units(U256::from(42u64), 6), "0.000042");
        assert_eq!(format_units(U256::ZERO, 18), "0.0");
    }
}
