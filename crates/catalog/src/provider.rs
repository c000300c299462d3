//! The read-only catalog seam consumed by the orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::{BehaviorRule, CatalogEntry};

/// A customer question the catalog could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusualQuestion {
    pub customer_id: String,
    pub question: String,
    pub context: String,
}

/// Source of products, behavior rules and reply templates.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// In-stock products matching a free-text query, best first.
    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Behavior rules in evaluation order.
    async fn behavior_rules(&self) -> Result<Vec<BehaviorRule>, CatalogError>;

    /// Named reply templates.
    async fn templates(&self) -> Result<HashMap<String, String>, CatalogError>;

    /// Record a question for the operator to add to the knowledge base.
    async fn log_unusual_question(&self, question: UnusualQuestion) -> Result<(), CatalogError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: CatalogProvider + ?Sized> CatalogProvider for Arc<T> {
    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        (**self).search_products(query, limit).await
    }

    async fn behavior_rules(&self) -> Result<Vec<BehaviorRule>, CatalogError> {
        (**self).behavior_rules().await
    }

    async fn templates(&self) -> Result<HashMap<String, String>, CatalogError> {
        (**self).templates().await
    }

    async fn log_unusual_question(&self, question: UnusualQuestion) -> Result<(), CatalogError> {
        (**self).log_unusual_question(question).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
