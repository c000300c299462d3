//! Local product store loaded from a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::provider::{CatalogProvider, UnusualQuestion};
use crate::search::search;
use crate::types::{BehaviorRule, CatalogEntry, Row};

/// Raw catalog document: `{ "products": [...], "rules": [...], "templates": {...} }`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub products: Vec<Row>,
    #[serde(default)]
    pub rules: Vec<Row>,
    #[serde(default)]
    pub templates: HashMap<String, String>,
}

impl CatalogDocument {
    /// Run every row through the adapter, skipping invalid ones.
    pub fn into_parts(self) -> (Vec<CatalogEntry>, Vec<BehaviorRule>, HashMap<String, String>) {
        let products = self
            .products
            .iter()
            .filter_map(|row| match CatalogEntry::from_row(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping catalog row: {}", e);
                    None
                }
            })
            .collect();
        let rules = self
            .rules
            .iter()
            .filter_map(|row| match BehaviorRule::from_row(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("Skipping rule row: {}", e);
                    None
                }
            })
            .collect();
        (products, rules, self.templates)
    }
}

/// In-process catalog.
///
/// Also serves as the fallback product store when the remote knowledge
/// base is unreachable.
#[derive(Debug, Default)]
pub struct LocalCatalog {
    products: Vec<CatalogEntry>,
    rules: Vec<BehaviorRule>,
    templates: HashMap<String, String>,
    unusual: Mutex<Vec<UnusualQuestion>>,
}

impl LocalCatalog {
    pub fn new(products: Vec<CatalogEntry>, rules: Vec<BehaviorRule>) -> Self {
        Self {
            products,
            rules,
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_templates(mut self, templates: HashMap<String, String>) -> Self {
        self.templates = templates;
        self
    }

    /// Parse a catalog document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let (products, rules, templates) = document.into_parts();
        Ok(Self::new(products, rules).with_templates(templates))
    }

    /// Load a catalog document from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json_str(&json)?;
        info!(
            "Loaded local catalog from {} ({} products, {} rules)",
            path.display(),
            catalog.products.len(),
            catalog.rules.len()
        );
        Ok(catalog)
    }

    pub fn products(&self) -> &[CatalogEntry] {
        &self.products
    }

    /// Questions logged through [`CatalogProvider::log_unusual_question`].
    pub fn unusual_questions(&self) -> Vec<UnusualQuestion> {
        self.unusual
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CatalogProvider for LocalCatalog {
    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(search(&self.products, query, limit))
    }

    async fn behavior_rules(&self) -> Result<Vec<BehaviorRule>, CatalogError> {
        Ok(self.rules.clone())
    }

    async fn templates(&self) -> Result<HashMap<String, String>, CatalogError> {
        Ok(self.templates.clone())
    }

    async fn log_unusual_question(&self, question: UnusualQuestion) -> Result<(), CatalogError> {
        info!(customer_id = %question.customer_id, "Unusual question: {}", question.question);
        if let Ok(mut unusual) = self.unusual.lock() {
            unusual.push(question);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
