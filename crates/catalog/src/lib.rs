//! Product catalog and behavior rules for the storefront assistant.
//!
//! Products, scripted behavior rules and reply templates come from an
//! external knowledge base ([`RemoteCatalog`]) or a local JSON file
//! ([`LocalCatalog`]). Raw rows are validated at the boundary by
//! [`CatalogEntry::from_row`] and [`BehaviorRule::from_row`].
//!
//! # Example
//!
//! ```no_run
//! use catalog::{CatalogProvider, LocalCatalog};
//!
//! # async fn example() -> Result<(), catalog::CatalogError> {
//! let catalog = LocalCatalog::load("catalog.json").await?;
//! for product in catalog.search_products("сукня", 5).await? {
//!     println!("{}", product.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod local;
pub mod provider;
pub mod remote;
pub mod search;
pub mod types;

pub use error::CatalogError;
pub use local::{CatalogDocument, LocalCatalog};
pub use provider::{CatalogProvider, UnusualQuestion};
pub use remote::{RemoteCatalog, RemoteCatalogConfig};
pub use types::{format_price, BehaviorRule, CatalogEntry, Row};
