//! Knowledge-base export served over HTTP, with a TTL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::provider::{CatalogProvider, UnusualQuestion};
use crate::search::search;
use crate::types::{BehaviorRule, CatalogEntry, Row};
use crate::local::CatalogDocument;

/// Configuration for [`RemoteCatalog`].
#[derive(Debug, Clone)]
pub struct RemoteCatalogConfig {
    /// Base URL of the knowledge-base export (e.g., "https://kb.example.com/api").
    pub base_url: String,
    /// How long fetched rows are served without refetching.
    pub cache_ttl: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteCatalogConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_ttl: Duration::from_secs(300),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// List endpoints answer either a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowsResponse {
    Bare(Vec<Row>),
    Wrapped { data: Vec<Row> },
}

impl RowsResponse {
    fn into_rows(self) -> Vec<Row> {
        match self {
            RowsResponse::Bare(rows) | RowsResponse::Wrapped { data: rows } => rows,
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    fetched_at: Instant,
    products: Vec<CatalogEntry>,
    rules: Vec<BehaviorRule>,
    templates: HashMap<String, String>,
}

/// Catalog backed by the remote knowledge base.
pub struct RemoteCatalog {
    http: Client,
    config: RemoteCatalogConfig,
    cache: RwLock<Option<Snapshot>>,
}

impl RemoteCatalog {
    pub fn new(config: RemoteCatalogConfig) -> Result<Self, CatalogError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            cache: RwLock::new(None),
        })
    }

    /// Drop the cached snapshot so the next read refetches.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = self.config.url(path);
        debug!("Knowledge base GET {}", url);

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch(&self) -> Result<Snapshot, CatalogError> {
        let products: RowsResponse = self.get_json("products").await?;
        let rules: RowsResponse = self.get_json("rules").await?;
        let templates: HashMap<String, String> = self.get_json("templates").await?;

        let (products, rules, templates) = CatalogDocument {
            products: products.into_rows(),
            rules: rules.into_rows(),
            templates,
        }
        .into_parts();

        info!(
            "Fetched knowledge base ({} products, {} rules)",
            products.len(),
            rules.len()
        );

        Ok(Snapshot {
            fetched_at: Instant::now(),
            products,
            rules,
            templates,
        })
    }

    /// Current snapshot: cached if fresh, refetched otherwise, stale on fetch failure.
    async fn snapshot(&self) -> Result<Snapshot, CatalogError> {
        if let Some(snapshot) = self.cache.read().await.as_ref() {
            if snapshot.fetched_at.elapsed() < self.config.cache_ttl {
                return Ok(snapshot.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(snapshot) = cache.as_ref() {
            if snapshot.fetched_at.elapsed() < self.config.cache_ttl {
                return Ok(snapshot.clone());
            }
        }

        match self.fetch().await {
            Ok(snapshot) => {
                *cache = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => match cache.as_ref() {
                Some(stale) => {
                    warn!("Knowledge base refresh failed, serving stale copy: {}", e);
                    Ok(stale.clone())
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl CatalogProvider for RemoteCatalog {
    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let snapshot = self.snapshot().await?;
        Ok(search(&snapshot.products, query, limit))
    }

    async fn behavior_rules(&self) -> Result<Vec<BehaviorRule>, CatalogError> {
        Ok(self.snapshot().await?.rules)
    }

    async fn templates(&self) -> Result<HashMap<String, String>, CatalogError> {
        Ok(self.snapshot().await?.templates)
    }

    async fn log_unusual_question(&self, question: UnusualQuestion) -> Result<(), CatalogError> {
        let url = self.config.url("unusual-questions");
        debug!("Knowledge base POST {}", url);

        let resp = self.http.post(&url).json(&question).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    async fn mock_kb(server: &mut Server, expect: usize) -> Vec<mockito::Mock> {
        vec![
            server
                .mock("GET", "/products")
                .with_status(200)
                .with_body(r#"{"data": [{"name": "Сукня Лілія", "price": 950}]}"#)
                .expect(expect)
                .create_async()
                .await,
            server
                .mock("GET", "/rules")
                .with_status(200)
                .with_body(r#"[{"situation": "Оплата", "triggers": "оплата, карта", "response_text": "Накладений платіж"}]"#)
                .expect(expect)
                .create_async()
                .await,
            server
                .mock("GET", "/templates")
                .with_status(200)
                .with_body(r#"{"thanks": "Дякуємо!"}"#)
                .expect(expect)
                .create_async()
                .await,
        ]
    }

    #[tokio::test]
    async fn test_fetch_and_cache() {
        let mut server = Server::new_async().await;
        let mocks = mock_kb(&mut server, 1).await;

        let catalog = RemoteCatalog::new(RemoteCatalogConfig::new(server.url())).unwrap();
        let hits = catalog.search_products("сукня", 5).await.unwrap();
        assert_eq!(hits.len(), 1);

        let rules = catalog.behavior_rules().await.unwrap();
        assert_eq!(rules[0].triggers, vec!["оплата", "карта"]);
        assert!(catalog.templates().await.unwrap().contains_key("thanks"));

        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_serves_stale_copy_when_refresh_fails() {
        let mut server = Server::new_async().await;
        let mocks = mock_kb(&mut server, 1).await;

        let catalog = RemoteCatalog::new(
            RemoteCatalogConfig::new(server.url()).with_cache_ttl(Duration::from_millis(0)),
        )
        .unwrap();
        assert_eq!(catalog.behavior_rules().await.unwrap().len(), 1);

        for mock in mocks {
            mock.remove_async().await;
        }
        let _down = server
            .mock("GET", "/products")
            .with_status(503)
            .create_async()
            .await;

        let rules = catalog.behavior_rules().await.unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn test_error_without_cache() {
        let mut server = Server::new_async().await;
        let _down = server
            .mock("GET", "/products")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let catalog = RemoteCatalog::new(RemoteCatalogConfig::new(server.url())).unwrap();
        let result = catalog.search_products("сукня", 5).await;
        assert!(matches!(result, Err(CatalogError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_log_unusual_question_posts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/unusual-questions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"customer_id": "maria"}"#.to_string(),
            ))
            .with_status(201)
            .create_async()
            .await;

        let catalog = RemoteCatalog::new(RemoteCatalogConfig::new(server.url())).unwrap();
        catalog
            .log_unusual_question(UnusualQuestion {
                customer_id: "maria".to_string(),
                question: "Чи є опт?".to_string(),
                context: String::new(),
            })
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
