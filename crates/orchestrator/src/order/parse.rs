//! Free-text product list to priced line items.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<amount> грн` at the end of a line, optionally preceded by a dash.
static TRAILING_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("(?:([-–—])\\s*)?(\\d+(?:[ \u{a0}]\\d{3})*(?:[.,]\\d{1,2})?)\\s*грн\\.?\\s*$").unwrap()
});

/// First amount in a string, thousands separated by spaces allowed.
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new("\\d+(?:[ \u{a0}]\\d{3})*(?:[.,]\\d{1,2})?").unwrap());

/// Leading list bullets: `-`, `•`, `*`, `1.`, `2)`.
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-•*·]+|\d+[.)])\s+").unwrap());

/// One product line of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
    /// The line as the customer confirmed it.
    pub source_line: String,
}

/// Parse an amount such as `"1 250,50 грн"`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let found = AMOUNT.find(text)?;
    to_number(found.as_str())
}

/// Split a product list into line items.
///
/// A trailing price is split off each line; lines without one get price 0.
pub fn parse_lines(text: &str) -> Vec<LineItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = strip_bullet(line);
            match split_price(line) {
                Some((name, price)) if !name.is_empty() => LineItem {
                    name,
                    price,
                    source_line: line.to_string(),
                },
                _ => LineItem {
                    name: line.to_string(),
                    price: 0.0,
                    source_line: line.to_string(),
                },
            }
        })
        .collect()
}

/// Spread the order total evenly when no line carried a price.
///
/// Each share is rounded to cents. Items are left untouched if any line
/// has a nonzero price or the total is unknown.
pub fn backfill_prices(items: &mut [LineItem], total: Option<f64>) {
    let Some(total) = total.filter(|t| *t > 0.0) else {
        return;
    };
    if items.is_empty() || items.iter().any(|item| item.price > 0.0) {
        return;
    }

    let share = round_cents(total / items.len() as f64);
    for item in items.iter_mut() {
        item.price = share;
    }
}

/// Parse lines and apply the price backfill.
pub fn parse_products(text: &str, total: Option<f64>) -> Vec<LineItem> {
    let mut items = parse_lines(text);
    backfill_prices(&mut items, total);
    items
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Name and trailing price of one line.
///
/// Space-grouped thousands are only read as one amount after a dash or
/// when the amount is the whole line; otherwise the leading groups stay
/// in the name (`"Джинси 32 999 грн"` is size 32 at 999).
fn split_price(line: &str) -> Option<(String, f64)> {
    let caps = TRAILING_PRICE.captures(line)?;
    let whole = caps.get(0)?;
    let amount = caps.get(2)?;
    let grouped = caps.get(1).is_some() || whole.start() == 0;

    let (name_end, raw) = match amount.as_str().rsplit_once([' ', '\u{a0}']) {
        Some((head, tail)) if !grouped => (amount.start() + head.len(), tail),
        _ => (whole.start(), amount.as_str()),
    };
    let price = to_number(raw)?;
    let name = line[..name_end]
        .trim()
        .trim_end_matches(|c: char| matches!(c, '-' | '–' | '—' | ':' | ','))
        .trim();
    Some((name.to_string(), price))
}

fn strip_bullet(line: &str) -> &str {
    match BULLET.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line,
    }
}

fn to_number(raw: &str) -> Option<f64> {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect::<String>()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priced_lines() {
        let items = parse_products("Сукня М — 950 грн\nШарф — 300 грн", Some(1250.0));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Сукня М");
        assert_eq!(items[0].price, 950.0);
        assert_eq!(items[1].name, "Шарф");
        assert_eq!(items[1].price, 300.0);
    }

    #[test]
    fn test_backfill_when_no_prices() {
        let items = parse_products("Hat — no price\nScarf — no price", Some(200.0));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Hat — no price");
        assert!(items.iter().all(|item| item.price == 100.0));
    }

    #[test]
    fn test_backfill_rounds_to_cents() {
        let items = parse_products("A\nB\nC", Some(100.0));
        assert!(items.iter().all(|item| item.price == 33.33));
    }

    #[test]
    fn test_no_backfill_when_any_price_known() {
        let items = parse_products("Сукня - 950 грн\nПакет", Some(1000.0));
        assert_eq!(items[0].price, 950.0);
        assert_eq!(items[1].price, 0.0);
    }

    #[test]
    fn test_no_backfill_without_total() {
        let items = parse_products("Сукня\nШарф", None);
        assert!(items.iter().all(|item| item.price == 0.0));
    }

    #[test]
    fn test_bullets_thousands_and_decimals() {
        let items = parse_lines("1. Пальто Зима - 2 450 грн.\n• Рукавички 199,50 грн\n\n- Шапка");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].name, "Пальто Зима");
        assert_eq!(items[0].price, 2450.0);
        assert_eq!(items[1].name, "Рукавички");
        assert_eq!(items[1].price, 199.5);
        assert_eq!(items[2].name, "Шапка");
        assert_eq!(items[2].source_line, "Шапка");
    }

    #[test]
    fn test_trailing_number_stays_in_name() {
        let items = parse_lines("Джинси 32 999 грн\nКомплект 2 шт - 1 200 грн");
        assert_eq!(items[0].name, "Джинси 32");
        assert_eq!(items[0].price, 999.0);
        assert_eq!(items[1].name, "Комплект 2 шт");
        assert_eq!(items[1].price, 1200.0);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1 250 грн"), Some(1250.0));
        assert_eq!(parse_amount("разом: 99,90"), Some(99.9));
        assert_eq!(parse_amount("без суми"), None);
    }
}
