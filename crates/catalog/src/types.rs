//! Typed catalog records and the adapter that builds them from raw rows.
//!
//! Knowledge-base rows arrive as loosely typed JSON objects whose column
//! headers may be English or Ukrainian. Everything is validated and
//! normalized here so the rest of the system only sees typed records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CatalogError;

/// A raw knowledge-base row.
pub type Row = Map<String, Value>;

/// A product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Article / SKU.
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub related_products: Vec<String>,
    pub in_stock: bool,
}

impl CatalogEntry {
    /// Create an in-stock entry with only a name and price.
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            sku: None,
            category: None,
            price,
            sizes: Vec::new(),
            colors: Vec::new(),
            material: None,
            description: None,
            image_url: None,
            related_products: Vec::new(),
            in_stock: true,
        }
    }

    /// Build an entry from a raw row.
    pub fn from_row(row: &Row) -> Result<Self, CatalogError> {
        let name = text(row, &["name", "назва", "товар", "product"]).ok_or_else(|| {
            CatalogError::InvalidRow {
                kind: "product",
                reason: "missing name".to_string(),
            }
        })?;

        let price = match lookup(row, &["price", "ціна", "цена"]) {
            None | Some(Value::Null) => 0.0,
            Some(value) => parse_price(value).ok_or_else(|| CatalogError::InvalidRow {
                kind: "product",
                reason: format!("unparseable price for {}: {}", name, value),
            })?,
        };

        let in_stock = lookup(row, &["in_stock", "наявність", "в наявності", "available"])
            .map(parse_flag)
            .unwrap_or(true);

        Ok(Self {
            name,
            sku: text(row, &["sku", "article", "артикул"]),
            category: text(row, &["category", "категорія", "категория"]),
            price,
            sizes: list(row, &["sizes", "розміри", "размеры"]),
            colors: list(row, &["colors", "кольори", "цвета"]),
            material: text(row, &["material", "матеріал", "материал"]),
            description: text(row, &["description", "опис", "описание"]),
            image_url: text(row, &["image_url", "image", "фото"]),
            related_products: list(row, &["related_products", "related", "супутні"]),
            in_stock,
        })
    }

    /// One-line summary used in the generation context.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} - {} грн", self.name, format_price(self.price))];
        if let Some(sku) = &self.sku {
            parts.push(format!("артикул {}", sku));
        }
        if !self.sizes.is_empty() {
            parts.push(format!("розміри: {}", self.sizes.join(", ")));
        }
        if !self.colors.is_empty() {
            parts.push(format!("кольори: {}", self.colors.join(", ")));
        }
        if let Some(material) = &self.material {
            parts.push(format!("матеріал: {}", material));
        }
        if let Some(description) = &self.description {
            parts.push(description.clone());
        }
        if !self.related_products.is_empty() {
            parts.push(format!("з цим беруть: {}", self.related_products.join(", ")));
        }
        parts.join("; ")
    }
}

/// A scripted trigger → canned response override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorRule {
    pub situation: String,
    /// Lowercase trigger phrases, in catalog order.
    pub triggers: Vec<String>,
    pub response_text: String,
    pub action: Option<String>,
}

impl BehaviorRule {
    pub fn new(
        situation: impl Into<String>,
        triggers: impl IntoIterator<Item = impl AsRef<str>>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            situation: situation.into(),
            triggers: triggers
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            response_text: response_text.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into().trim().to_lowercase());
        self
    }

    /// Whether matching this rule also hands the conversation to an operator.
    pub fn escalates(&self) -> bool {
        self.action.as_deref() == Some("escalate")
    }

    /// Build a rule from a raw row.
    pub fn from_row(row: &Row) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidRow {
            kind: "rule",
            reason: reason.to_string(),
        };

        let situation =
            text(row, &["situation", "ситуація", "ситуация"]).ok_or_else(|| invalid("missing situation"))?;
        let triggers: Vec<String> = list(row, &["triggers", "тригери", "триггеры", "keywords"])
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        if triggers.is_empty() {
            return Err(invalid("no triggers"));
        }
        let response_text = text(row, &["response_text", "response", "відповідь", "ответ"])
            .ok_or_else(|| invalid("missing response"))?;
        let action = text(row, &["action", "дія", "действие"]).map(|a| a.to_lowercase());

        Ok(Self {
            situation,
            triggers,
            response_text,
            action,
        })
    }
}

/// Price without trailing zeros for whole amounts.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{:.0}", price)
    } else {
        format!("{:.2}", price)
    }
}

fn lookup<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a Value> {
    row.iter()
        .find(|(key, _)| {
            let key = key.trim().to_lowercase();
            keys.iter().any(|k| *k == key)
        })
        .map(|(_, value)| value)
}

fn text(row: &Row, keys: &[&str]) -> Option<String> {
    let value = match lookup(row, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn list(row: &Row, keys: &[&str]) -> Vec<String> {
    let items: Vec<String> = match lookup(row, keys) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(|c| c == ',' || c == ';' || c == '\n')
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                .collect();
            if cleaned.is_empty() {
                return Some(0.0);
            }
            cleaned.replace(',', ".").parse().ok()
        }
        _ => None,
    }
}

fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "так" | "да" | "yes" | "true" | "1" | "+" | "є" | "есть"
        ),
        _ => false,
    }
}
