//! CRM HTTP client.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{normalize_phone, CrmConfig};
use crate::error::CrmError;
use crate::types::{extract_created_id, CrmProduct, CrmVariant, ListResponse, NewClient, NewSale};

/// Maximum length of a response body carried in an error.
const BODY_PREVIEW_CHARS: usize = 500;

/// Client for the CRM API.
#[derive(Clone)]
pub struct CrmClient {
    http: Client,
    config: CrmConfig,
}

impl CrmClient {
    /// Create a new client.
    pub fn new(config: CrmConfig) -> Result<Self, CrmError> {
        if config.api_key.trim().is_empty() {
            return Err(CrmError::Config("API key is empty".into()));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    /// Probe connectivity via the warehouses endpoint.
    pub async fn health_check(&self) -> Result<(), CrmError> {
        let resp = self.request(Method::GET, "warehouses").send().await?;
        self.read_body(resp).await?;
        info!("CRM reachable at {}", self.config.base_url);
        Ok(())
    }

    /// One page of the product list.
    pub async fn list_products(&self, limit: u32, offset: u32) -> Result<Vec<CrmProduct>, CrmError> {
        let resp = self
            .request(Method::GET, "products")
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        let list: ListResponse<CrmProduct> = self.read_json(resp).await?;
        Ok(list.into_items())
    }

    /// Variants of a product.
    pub async fn product_variants(&self, pid: i64) -> Result<Vec<CrmVariant>, CrmError> {
        let resp = self
            .request(Method::GET, "products")
            .query(&[("product_id", pid)])
            .send()
            .await?;
        let list: ListResponse<CrmVariant> = self.read_json(resp).await?;
        Ok(list.into_items())
    }

    /// Create (or find) a client record. Local phone numbers are normalized first.
    pub async fn create_client(&self, client: &NewClient) -> Result<i64, CrmError> {
        let client = NewClient {
            phone: normalize_phone(&client.phone, &self.config.country_prefix),
            ..client.clone()
        };
        debug!(username = %client.username, phone = %client.phone, "CRM create client");

        let resp = self.request(Method::POST, "clients").json(&client).send().await?;
        let value: Value = self.read_json(resp).await?;
        extract_created_id(&value).ok_or_else(|| CrmError::MissingId(preview(&value.to_string())))
    }

    /// Create a sale. The configured source is used when none is set.
    pub async fn create_sale(&self, sale: &NewSale) -> Result<i64, CrmError> {
        let mut sale = sale.clone();
        if sale.source_id.is_none() {
            sale.source_id = self.config.source_id;
        }
        debug!(
            client_id = sale.client_id,
            items = sale.products.len(),
            amount = sale.amount,
            "CRM create sale"
        );

        let resp = self.request(Method::PUT, "sales").json(&sale).send().await?;
        let value: Value = self.read_json(resp).await?;
        extract_created_id(&value).ok_or_else(|| CrmError::MissingId(preview(&value.to_string())))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!("CRM {} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
    }

    async fn read_body(&self, resp: Response) -> Result<String, CrmError> {
        let status = resp.status();
        let body = resp.text().await?;
        debug!("CRM response {}: {}", status.as_u16(), preview(&body));

        if !status.is_success() {
            warn!("CRM error {}: {}", status.as_u16(), preview(&body));
            return Err(CrmError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }
        Ok(body)
    }

    async fn read_json<T: DeserializeOwned>(&self, resp: Response) -> Result<T, CrmError> {
        let body = self.read_body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleItem;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> CrmClient {
        CrmClient::new(CrmConfig::new(server.url(), "test-key").with_source_id(3)).unwrap()
    }

    #[tokio::test]
    async fn test_create_client_normalizes_phone() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/clients")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Json(serde_json::json!({
                "full_name": "Марія Коваленко",
                "phone": "+380687034410",
                "username": "maria"
            })))
            .with_status(201)
            .with_body(r#"{"id": 501}"#)
            .create_async()
            .await;

        let id = client_for(&server)
            .create_client(&NewClient {
                full_name: "Марія Коваленко".to_string(),
                phone: "0687034410".to_string(),
                username: "maria".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(id, 501);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_sale_uses_configured_source() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/sales")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "client_id": 501,
                "source_id": 3,
                "amount": 300.0
            })))
            .with_status(200)
            .with_body(r#"{"data": [{"id": 9001}]}"#)
            .create_async()
            .await;

        let sale = NewSale {
            client_id: 501,
            source_id: None,
            products: vec![SaleItem::new("Шарф", 300.0)],
            amount: 300.0,
            net_amount: 300.0,
            comment: "test".to_string(),
        };
        assert_eq!(client_for(&server).create_sale(&sale).await.unwrap(), 9001);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_surfaces_truncated_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/clients")
            .with_status(422)
            .with_body("x".repeat(2000))
            .create_async()
            .await;

        let result = client_for(&server)
            .create_client(&NewClient {
                full_name: "A".to_string(),
                phone: "+380000000000".to_string(),
                username: "a".to_string(),
            })
            .await;

        match result {
            Err(CrmError::Status { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body.len(), BODY_PREVIEW_CHARS);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_id_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/sales")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let sale = NewSale {
            client_id: 1,
            source_id: None,
            products: Vec::new(),
            amount: 0.0,
            net_amount: 0.0,
            comment: String::new(),
        };
        let result = client_for(&server).create_sale(&sale).await;
        assert!(matches!(result, Err(CrmError::MissingId(_))));
    }

    #[tokio::test]
    async fn test_products_and_variants() {
        let mut server = Server::new_async().await;
        let products = server
            .mock("GET", "/products")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "50".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data": [{"id": 10, "name": "Сукня Лілія"}], "total": 1}"#)
            .create_async()
            .await;
        let variants = server
            .mock("GET", "/products")
            .match_query(Matcher::UrlEncoded("product_id".into(), "10".into()))
            .with_status(200)
            .with_body(r#"[{"id": 100, "size": "S"}, {"id": 101, "size": "M"}]"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let list = client.list_products(50, 0).await.unwrap();
        assert_eq!(list[0].name, "Сукня Лілія");
        let found = client.product_variants(10).await.unwrap();
        assert_eq!(found.iter().map(|v| v.id).collect::<Vec<_>>(), vec![100, 101]);

        products.assert_async().await;
        variants.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("GET", "/warehouses")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        assert!(client_for(&server).health_check().await.is_ok());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            CrmClient::new(CrmConfig::new("http://crm", " ")),
            Err(CrmError::Config(_))
        ));
    }
}
