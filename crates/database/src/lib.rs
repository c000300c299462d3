//! SQLite persistence layer for the storefront assistant.
//!
//! This crate stores the conversation transcript, leads and orders using
//! SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{message, Database, NewMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:storefront.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Store a customer message together with its reply
//!     let question = NewMessage {
//!         customer_id: "17841400000000000".to_string(),
//!         content: "Є шарфи?".to_string(),
//!         display_name: Some("Марія".to_string()),
//!         channel_timestamp: Some("1718000000000".to_string()),
//!     };
//!     message::record_exchange(db.pool(), &question, "Так, є!").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod lead;
pub mod message;
pub mod models;
pub mod order;

pub use error::{DatabaseError, Result};
pub use models::{
    order_status, Lead, LeadStatus, LeadUpdate, Message, MessageRole, NewMessage, NewOrder, Order,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 5;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// Every connection to `sqlite::memory:` opens a separate database, so
    /// in-memory databases should use [`Database::connect_with_pool_size`] with 1.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Open a migrated in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('messages', 'leads', 'orders') ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, vec!["leads", "messages", "orders"]);
    }

    #[tokio::test]
    async fn test_conversation_then_lead_then_order() {
        let db = Database::in_memory().await.unwrap();

        let question = NewMessage {
            customer_id: "maria".to_string(),
            content: "Беру шарф".to_string(),
            display_name: Some("Марія".to_string()),
            channel_timestamp: Some("1".to_string()),
        };
        message::record_exchange(db.pool(), &question, "Дякуємо за замовлення!")
            .await
            .unwrap();

        let lead = lead::upsert_lead(db.pool(), "maria", &LeadUpdate::default())
            .await
            .unwrap();
        let order_id = order::create_order(
            db.pool(),
            &NewOrder {
                customer_id: lead.customer_id.clone(),
                products: "Шарф".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(message::count_messages(db.pool(), "maria", None).await.unwrap(), 2);
        assert_eq!(order::get_order(db.pool(), order_id).await.unwrap().customer_id, "maria");
    }
}
