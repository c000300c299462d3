//! Client for the storefront CRM.
//!
//! Covers the calls the order push needs: product list and variants for
//! id resolution, client upsert, sale creation, plus a connectivity probe.
//!
//! # Example
//!
//! ```no_run
//! use crm_client::{CrmClient, CrmConfig, NewClient};
//!
//! # async fn example() -> Result<(), crm_client::CrmError> {
//! let client = CrmClient::new(CrmConfig::new("https://crm.example.com/v1", "key"))?;
//! client.health_check().await?;
//!
//! let client_id = client
//!     .create_client(&NewClient {
//!         full_name: "Марія Коваленко".into(),
//!         phone: "0687034410".into(),
//!         username: "maria".into(),
//!     })
//!     .await?;
//! # let _ = client_id;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::CrmClient;
pub use config::{normalize_phone, CrmConfig, DEFAULT_COUNTRY_PREFIX};
pub use error::CrmError;
pub use types::{
    extract_created_id, CrmProduct, CrmVariant, NewClient, NewSale, SaleItem, VariantProperty,
};
