//! CRM wire types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// List endpoints answer either `{ "data": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Wrapped { data } | ListResponse::Bare(data) => data,
        }
    }
}

/// A catalog product as the CRM knows it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CrmProduct {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// A named attribute of a variant (e.g. "Розмір" = "M").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantProperty {
    pub name: String,
    pub value: String,
}

/// A purchasable variant (`mid`) of a product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CrmVariant {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub properties: Vec<VariantProperty>,
}

impl CrmVariant {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            product_id: None,
            sku: None,
            name: None,
            size: None,
            price: None,
            properties: Vec::new(),
        }
    }

    /// Size from the dedicated field or a size-like property.
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref().or_else(|| {
            self.properties
                .iter()
                .find(|p| {
                    let name = p.name.to_lowercase();
                    name.contains("size") || name.contains("розмір") || name.contains("размер")
                })
                .map(|p| p.value.as_str())
        })
    }

    /// One listing line: `id=…; size=…; sku=…; name=…`.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("id={}", self.id)];
        if let Some(size) = self.size() {
            parts.push(format!("size={}", size));
        }
        if let Some(sku) = &self.sku {
            parts.push(format!("sku={}", sku));
        }
        if let Some(name) = &self.name {
            parts.push(format!("name={}", name));
        }
        for property in &self.properties {
            let lower = property.name.to_lowercase();
            if !(lower.contains("size") || lower.contains("розмір") || lower.contains("размер")) {
                parts.push(format!("{}={}", property.name, property.value));
            }
        }
        parts.join("; ")
    }
}

/// Client creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewClient {
    pub full_name: String,
    pub phone: String,
    /// Customer's channel identity, used as the CRM lookup key.
    pub username: String,
}

/// One line of a sale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleItem {
    pub name: String,
    pub count: u32,
    pub discount: f64,
    pub finish_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mid: Option<i64>,
}

impl SaleItem {
    pub fn new(name: impl Into<String>, finish_price: f64) -> Self {
        Self {
            name: name.into(),
            count: 1,
            discount: 0.0,
            finish_price,
            pid: None,
            mid: None,
        }
    }
}

/// Sale creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSale {
    pub client_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    pub products: Vec<SaleItem>,
    pub amount: f64,
    pub net_amount: f64,
    pub comment: String,
}

/// Id of a created record: `{ "id": … }` or `{ "data": [{ "id": … }] }`.
pub fn extract_created_id(value: &Value) -> Option<i64> {
    fn as_id(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    if let Some(id) = value.get("id").and_then(as_id) {
        return Some(id);
    }
    match value.get("data") {
        Some(Value::Array(items)) => items.first().and_then(|item| item.get("id")).and_then(as_id),
        Some(data @ Value::Object(_)) => data.get("id").and_then(as_id),
        _ => None,
    }
}

fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", value)))
}
