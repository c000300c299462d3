//! Lead operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Lead, LeadStatus, LeadUpdate};

const LEAD_COLUMNS: &str = "customer_id, display_name, phone, email, city, delivery_address, \
     interested_products, status, notes, first_contact, last_contact, messages_count";

/// Create or merge a lead.
///
/// Provided fields overwrite stored ones; absent fields keep their value.
/// `messages_count` starts at 1 and grows by one per upsert, and
/// `last_contact` is refreshed every time. A `converted` lead keeps its
/// status; only [`update_status`] moves it.
pub async fn upsert_lead(pool: &SqlitePool, customer_id: &str, update: &LeadUpdate) -> Result<Lead> {
    let status = update.status.map(|s| s.as_str());

    let lead = sqlx::query_as::<_, Lead>(&format!(
        r#"
        INSERT INTO leads (
            customer_id, display_name, phone, email, city, delivery_address,
            interested_products, status, notes, messages_count
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, COALESCE(?, 'new'), ?, 1)
        ON CONFLICT(customer_id) DO UPDATE SET
            display_name = COALESCE(excluded.display_name, leads.display_name),
            phone = COALESCE(excluded.phone, leads.phone),
            email = COALESCE(excluded.email, leads.email),
            city = COALESCE(excluded.city, leads.city),
            delivery_address = COALESCE(excluded.delivery_address, leads.delivery_address),
            interested_products = COALESCE(excluded.interested_products, leads.interested_products),
            status = CASE WHEN leads.status = 'converted' THEN leads.status ELSE COALESCE(?, leads.status) END,
            notes = COALESCE(excluded.notes, leads.notes),
            last_contact = strftime('%Y-%m-%d %H:%M:%f', 'now'),
            messages_count = leads.messages_count + 1
        RETURNING {}
        "#,
        LEAD_COLUMNS
    ))
    .bind(customer_id)
    .bind(&update.display_name)
    .bind(&update.phone)
    .bind(&update.email)
    .bind(&update.city)
    .bind(&update.delivery_address)
    .bind(&update.interested_products)
    .bind(status)
    .bind(&update.notes)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(lead)
}

/// Get a lead by customer ID.
pub async fn get_lead(pool: &SqlitePool, customer_id: &str) -> Result<Lead> {
    sqlx::query_as::<_, Lead>(&format!(
        "SELECT {} FROM leads WHERE customer_id = ?",
        LEAD_COLUMNS
    ))
    .bind(customer_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Lead",
        id: customer_id.to_string(),
    })
}

/// Change a lead's status without counting it as contact.
pub async fn update_status(pool: &SqlitePool, customer_id: &str, status: LeadStatus) -> Result<()> {
    let result = sqlx::query("UPDATE leads SET status = ? WHERE customer_id = ?")
        .bind(status.as_str())
        .bind(customer_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Lead",
            id: customer_id.to_string(),
        });
    }

    Ok(())
}

/// List leads, most recently contacted first, optionally filtered by status.
pub async fn list_leads(pool: &SqlitePool, status: Option<LeadStatus>) -> Result<Vec<Lead>> {
    let leads = match status {
        Some(status) => {
            sqlx::query_as::<_, Lead>(&format!(
                "SELECT {} FROM leads WHERE status = ? ORDER BY last_contact DESC",
                LEAD_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Lead>(&format!(
                "SELECT {} FROM leads ORDER BY last_contact DESC",
                LEAD_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(leads)
}
