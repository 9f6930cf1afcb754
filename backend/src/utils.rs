/// Tolerance used when comparing summed share quantities.
pub const QUANTITY_EPSILON: f64 = 0.00001;

/// Normalizes user-supplied ticker symbols for storage and cache keys.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Exchanges are stored by upper-case name.
pub fn normalize_exchange(exchange: &str) -> String {
    exchange.trim().to_uppercase()
}

/// Renders a dollar amount in accounting notation: `$1,234.50`, `($0.01)`.
///
/// Rounds to cents half away from zero, so `-0.005` becomes `($0.01)`.
/// Amounts that round to zero render as `$0.00`.
pub fn format_accounting(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }

    let cents = (value * 100.0).round();
    if cents == 0.0 {
        return "$0.00".to_string();
    }

    let abs_cents = cents.abs() as u64;
    let dollars = abs_cents / 100;
    let remainder = abs_cents % 100;
    let body = format!("${}.{:02}", group_thousands(dollars), remainder);

    if cents < 0.0 {
        format!("({})", body)
    } else {
        body
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_plain_dollars() {
        assert_eq!(format_accounting(0.0), "$0.00");
        assert_eq!(format_accounting(-0.001), "$0.00");
    }

    #[test]
    fn negatives_round_away_from_zero() {
        assert_eq!(format_accounting(-0.005), "($0.01)");
        assert_eq!(format_accounting(-1234.567), "($1,234.57)");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_accounting(1234567.8), "$1,234,567.80");
        assert_eq!(format_accounting(999.99), "$999.99");
        assert_eq!(format_accounting(1000.0), "$1,000.00");
    }

    #[test]
    fn normalizes_tickers() {
        assert_eq!(normalize_ticker("  aapl "), "AAPL");
    }

    #[test]
    fn normalizes_exchanges() {
        assert_eq!(normalize_exchange(" Nasdaq"), "NASDAQ");
        assert_eq!(normalize_exchange("tsx"), normalize_exchange("TSX "));
    }
}
