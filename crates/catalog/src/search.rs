//! Keyword product search shared by every provider.

use crate::types::CatalogEntry;

const MIN_TOKEN_CHARS: usize = 3;

/// Search query tokens: lowercase words of at least three characters.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Drop a likely inflection ending so "сукню" and "сукні" both hit "сукня".
///
/// Five-letter words lose one trailing letter, longer ones two.
pub fn stem(token: &str) -> &str {
    let len = token.chars().count();
    let keep = match len {
        0..=4 => len,
        5 => 4,
        _ => len - 2,
    };
    token
        .char_indices()
        .nth(keep)
        .map_or(token, |(idx, _)| &token[..idx])
}

/// Rank in-stock products against a query.
///
/// Name hits weigh most, then SKU and category, then the remaining text
/// fields. Out-of-stock entries are never returned. Ties keep catalog order.
pub fn search(products: &[CatalogEntry], query: &str, limit: usize) -> Vec<CatalogEntry> {
    let tokens = tokenize(query);
    if tokens.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(u32, &CatalogEntry)> = products
        .iter()
        .filter(|p| p.in_stock)
        .filter_map(|p| {
            let score = score(p, &tokens);
            (score > 0).then_some((score, p))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, p)| p.clone())
        .collect()
}

fn score(product: &CatalogEntry, tokens: &[String]) -> u32 {
    let name = product.name.to_lowercase();
    let strong = [product.sku.as_deref(), product.category.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    let weak = [product.description.as_deref(), product.material.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .chain(product.colors.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    tokens
        .iter()
        .map(|t| stem(t))
        .map(|t| {
            if name.contains(t) {
                3
            } else if strong.contains(t) {
                2
            } else if weak.contains(t) {
                1
            } else {
                0
            }
        })
        .sum()
}
