//! Transcript operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Message, MessageRole, NewMessage};

const MESSAGE_COLUMNS: &str =
    "id, customer_id, role, content, created_at, display_name, answer_id, channel_timestamp";

/// Check whether an inbound message with this channel timestamp is already stored.
pub async fn user_message_exists(
    pool: &SqlitePool,
    customer_id: &str,
    channel_timestamp: &str,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
        FROM messages
        WHERE customer_id = ? AND channel_timestamp = ? AND role = 'user'
        LIMIT 1
        "#,
    )
    .bind(customer_id)
    .bind(channel_timestamp)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Store an inbound customer message.
///
/// Returns [`DatabaseError::AlreadyExists`] if the same
/// `(customer_id, channel_timestamp)` was stored before.
pub async fn insert_user_message(pool: &SqlitePool, message: &NewMessage) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO messages (customer_id, role, content, display_name, channel_timestamp)
        VALUES (?, 'user', ?, ?, ?)
        "#,
    )
    .bind(&message.customer_id)
    .bind(&message.content)
    .bind(&message.display_name)
    .bind(&message.channel_timestamp)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Message", dedup_id(message)))?;

    Ok(result.last_insert_rowid())
}

/// Store an inbound message and the reply it produced, linked both ways.
///
/// Runs in one transaction: the user message, the reply (pointing at the
/// user message) and finally the user message's `answer_id`. Returns
/// `(question_id, reply_id)`.
pub async fn record_exchange(
    pool: &SqlitePool,
    question: &NewMessage,
    reply: &str,
) -> Result<(i64, i64)> {
    let mut tx = pool.begin().await?;

    let question_id = sqlx::query(
        r#"
        INSERT INTO messages (customer_id, role, content, display_name, channel_timestamp)
        VALUES (?, 'user', ?, ?, ?)
        "#,
    )
    .bind(&question.customer_id)
    .bind(&question.content)
    .bind(&question.display_name)
    .bind(&question.channel_timestamp)
    .execute(&mut *tx)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Message", dedup_id(question)))?
    .last_insert_rowid();

    let reply_id = sqlx::query(
        r#"
        INSERT INTO messages (customer_id, role, content, answer_id)
        VALUES (?, 'assistant', ?, ?)
        "#,
    )
    .bind(&question.customer_id)
    .bind(reply)
    .bind(question_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query(
        r#"
        UPDATE messages
        SET answer_id = ?
        WHERE id = ? AND answer_id IS NULL
        "#,
    )
    .bind(reply_id)
    .bind(question_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((question_id, reply_id))
}

/// Get a message by ID.
pub async fn get_message(pool: &SqlitePool, id: i64) -> Result<Message> {
    sqlx::query_as::<_, Message>(&format!(
        "SELECT {} FROM messages WHERE id = ?",
        MESSAGE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Message",
        id: id.to_string(),
    })
}

/// The most recent `limit` messages for a customer, oldest first.
pub async fn recent_messages(
    pool: &SqlitePool,
    customer_id: &str,
    limit: usize,
) -> Result<Vec<Message>> {
    let mut messages = sqlx::query_as::<_, Message>(&format!(
        r#"
        SELECT {}
        FROM messages
        WHERE customer_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
        MESSAGE_COLUMNS
    ))
    .bind(customer_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    messages.reverse();
    Ok(messages)
}

/// Count stored messages for a customer, optionally by role.
pub async fn count_messages(
    pool: &SqlitePool,
    customer_id: &str,
    role: Option<MessageRole>,
) -> Result<i64> {
    let count = match role {
        Some(role) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM messages WHERE customer_id = ? AND role = ?",
            )
            .bind(customer_id)
            .bind(role.as_str())
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE customer_id = ?")
                .bind(customer_id)
                .fetch_one(pool)
                .await?
        }
    };

    Ok(count)
}

fn dedup_id(message: &NewMessage) -> String {
    format!(
        "{}/{}",
        message.customer_id,
        message.channel_timestamp.as_deref().unwrap_or("-")
    )
}
