//! Number formatting for text reports

/// Insert thousands separators into a non-negative whole number
fn group_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a currency value without cents
pub fn format_currency_short(value: f64) -> String {
    let grouped = group_thousands(value.abs().round() as u64);
    if value >= 0.0 {
        format!("${grouped}")
    } else {
        format!("-${grouped}")
    }
}

/// Format a currency value in compact form (e.g., $2.1M, $450K, $50)
pub fn format_compact_currency(value: f64) -> String {
    let abs_value = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    if abs_value >= 1_000_000_000.0 {
        format!("{sign}${:.1}B", abs_value / 1_000_000_000.0)
    } else if abs_value >= 1_000_000.0 {
        format!("{sign}${:.1}M", abs_value / 1_000_000.0)
    } else if abs_value >= 1_000.0 {
        format!("{sign}${:.0}K", abs_value / 1_000.0)
    } else {
        format!("{sign}${abs_value:.0}")
    }
}

/// Format a fraction as a percentage (0.125 -> "12.50%")
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Format a return multiple (2.346 -> "2.35x")
pub fn format_multiple(value: f64) -> String {
    format!("{value:.2}x")
}

/// Format an adjustment given in percent, using the infinity sign when unbounded
pub fn format_adjustment(percent: f64) -> String {
    if percent.is_infinite() {
        "∞".to_string()
    } else {
        format!("{percent:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_short() {
        assert_eq!(format_currency_short(1_234_567.4), "$1,234,567");
        assert_eq!(format_currency_short(-999.6), "-$1,000");
        assert_eq!(format_currency_short(0.0), "$0");
    }

    #[test]
    fn test_compact_currency() {
        assert_eq!(format_compact_currency(2_100_000.0), "$2.1M");
        assert_eq!(format_compact_currency(450_000.0), "$450K");
        assert_eq!(format_compact_currency(3_000_000_000.0), "$3.0B");
        assert_eq!(format_compact_currency(-50.0), "-$50");
    }

    #[test]
    fn test_multiple_and_percent() {
        assert_eq!(format_multiple(2.346), "2.35x");
        assert_eq!(format_percentage(0.125), "12.50%");
        assert_eq!(format_adjustment(12.5), "12.5%");
        assert_eq!(format_adjustment(f64::INFINITY), "∞");
    }
}
