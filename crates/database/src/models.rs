//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Transcript role of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One transcript entry.
///
/// Immutable once written, except `answer_id`, which is set exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    /// Channel identity of the customer.
    pub customer_id: String,
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
    pub created_at: String,
    pub display_name: Option<String>,
    /// For a user message: the reply it produced. For a reply: the message it answers.
    pub answer_id: Option<i64>,
    /// Channel-side timestamp (dedup key for user messages).
    pub channel_timestamp: Option<String>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User.as_str()
    }
}

/// An inbound customer message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMessage {
    pub customer_id: String,
    pub content: String,
    pub display_name: Option<String>,
    pub channel_timestamp: Option<String>,
}

/// Commercial status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "qualified" => Some(LeadStatus::Qualified),
            "converted" => Some(LeadStatus::Converted),
            "lost" => Some(LeadStatus::Lost),
            _ => None,
        }
    }
}

/// A customer's commercial profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub customer_id: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub delivery_address: Option<String>,
    pub interested_products: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub first_contact: String,
    pub last_contact: String,
    pub messages_count: i64,
}

/// Fields merged into a lead on upsert. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub delivery_address: Option<String>,
    pub interested_products: Option<String>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
}

/// Order lifecycle values used by the pipeline.
pub mod order_status {
    pub const NEW: &str = "new";
    pub const SALED: &str = "saled";
    pub const SHIPPED: &str = "shipped";
}

/// A confirmed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: String,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub delivery_point: Option<String>,
    /// Free-text product list as confirmed by the customer.
    pub products: String,
    pub total_price: Option<f64>,
    pub status: String,
    pub tracking_number: Option<String>,
    pub is_upsell: bool,
    pub created_at: String,
}

/// An order that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewOrder {
    pub customer_id: String,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub delivery_point: Option<String>,
    pub products: String,
    pub total_price: Option<f64>,
    pub is_upsell: bool,
}
