//! Display helpers for ticker values.

/// Direction of the last index move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

const STOP_WORDS: &[&str] = &["the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for"];

fn with_suffix(value: f64, prefix: &str) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{sign}{prefix}{:.1}M", abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{sign}{prefix}{:.1}k", abs / 1_000.0)
    } else {
        format!("{sign}{prefix}{:.0}", abs)
    }
}

/// `$12.3k`, `-$2.1k`, `$1.5M`, `$950`
pub fn fmt_money(value: f64) -> String {
    with_suffix(value, "$")
}

/// `12.3k`, `-2.1k`, `950`
pub fn fmt_number(value: f64) -> String {
    with_suffix(value, "")
}

/// Fraction as a percentage with one decimal: `0.31` → `31.0%`
pub fn fmt_pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Three-letter ticker symbol for a project name.
///
/// Stop words are dropped first. Three or more words give their initials,
/// two words give two letters of the first and one of the second, a single
/// word gives its first three letters.
pub fn abbr(name: &str) -> String {
    let words: Vec<&str> = name
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    let symbol: String = match words.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(3).collect(),
        [first, second] => first
            .chars()
            .take(2)
            .chain(second.chars().take(1))
            .collect(),
        many => many.iter().take(3).filter_map(|w| w.chars().next()).collect(),
    };
    symbol.to_uppercase()
}

/// Normalizes raw values to an index with the first value as 100.
/// A zero first value is treated as 1.
pub fn to_index_series(raw: &[f64]) -> Vec<f64> {
    let Some(first) = raw.first() else {
        return Vec::new();
    };
    let baseline = if *first == 0.0 { 1.0 } else { *first };
    raw.iter().map(|v| v / baseline * 100.0).collect()
}

/// Trend of the last step; moves under 0.5 are flat
pub fn trend(series: &[f64]) -> Trend {
    match series {
        [.., prev, last] => {
            let diff = last - prev;
            if diff.abs() < 0.5 {
                Trend::Flat
            } else if diff > 0.0 {
                Trend::Up
            } else {
                Trend::Down
            }
        }
        _ => Trend::Flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money() {
        assert_eq!(fmt_money(12_300.0), "$12.3k");
        assert_eq!(fmt_money(-2_100.0), "-$2.1k");
        assert_eq!(fmt_money(1_500_000.0), "$1.5M");
        assert_eq!(fmt_money(950.0), "$950");
        assert_eq!(fmt_money(0.0), "$0");
    }

    #[test]
    fn test_number_and_pct() {
        assert_eq!(fmt_number(412.0), "412");
        assert_eq!(fmt_number(-4_200.0), "-4.2k");
        assert_eq!(fmt_pct(0.31), "31.0%");
        assert_eq!(fmt_pct(0.055), "5.5%");
    }

    #[test]
    fn test_abbr() {
        assert_eq!(abbr("Internal Analytics Dashboard"), "IAD");
        assert_eq!(abbr("Mobile App Redesign"), "MAR");
        assert_eq!(abbr("Customer Portal"), "CUP");
        assert_eq!(abbr("Platform"), "PLA");
        assert_eq!(abbr("The Portal for Customers"), "POC");
        assert_eq!(abbr("api"), "API");
        assert_eq!(abbr(""), "");
    }

    #[test]
    fn test_index_series() {
        assert_eq!(to_index_series(&[50.0, 75.0, 25.0]), vec![100.0, 150.0, 50.0]);
        assert_eq!(to_index_series(&[0.0, 2.0]), vec![0.0, 200.0]);
        assert!(to_index_series(&[]).is_empty());
    }

    #[test]
    fn test_trend() {
        assert_eq!(trend(&[100.0, 101.0]), Trend::Up);
        assert_eq!(trend(&[100.0, 99.0]), Trend::Down);
        assert_eq!(trend(&[100.0, 100.4]), Trend::Flat);
        assert_eq!(trend(&[100.0]), Trend::Flat);
    }
}
