//! Lenient cell parsers. Feeds publish integers as `3`, `3.0` or `" 3 "`;
//! anything unparseable reads as absent rather than failing the row.

pub fn parse_optional_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite() && parsed.abs() < i64::MAX as f64)
        .map(|parsed| parsed.trunc() as i64)
}

pub fn parse_optional_i32(value: &str) -> Option<i32> {
    parse_optional_i64(value).and_then(|parsed| i32::try_from(parsed).ok())
}

pub fn parse_coordinate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Route ids compare case-insensitively across feeds.
pub fn normalize_route_id(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_float_spelling() {
        assert_eq!(parse_optional_i64("3"), Some(3));
        assert_eq!(parse_optional_i64(" 3.0 "), Some(3));
        assert_eq!(parse_optional_i64("7.9"), Some(7));
        assert_eq!(parse_optional_i64(""), None);
        assert_eq!(parse_optional_i64("north"), None);
        assert_eq!(parse_optional_i64("NaN"), None);
    }

    #[test]
    fn i32_rejects_overflow() {
        assert_eq!(parse_optional_i32("4294967296"), None);
        assert_eq!(parse_optional_i32("-12"), Some(-12));
    }

    #[test]
    fn coordinates_reject_non_finite() {
        assert_eq!(parse_coordinate("40.75"), Some(40.75));
        assert_eq!(parse_coordinate("inf"), None);
        assert_eq!(parse_coordinate(""), None);
    }

    #[test]
    fn route_ids_are_upper_cased() {
        assert_eq!(normalize_route_id(" 6x "), "6X");
    }
}
