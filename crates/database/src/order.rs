//! Order operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewOrder, Order};

const ORDER_COLUMNS: &str = "id, customer_id, display_name, full_name, phone, city, \
     delivery_point, products, total_price, status, tracking_number, is_upsell, created_at";

/// Store a confirmed order with status `new`. The customer's lead must exist.
pub async fn create_order(pool: &SqlitePool, order: &NewOrder) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (
            customer_id, display_name, full_name, phone, city,
            delivery_point, products, total_price, is_upsell
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.customer_id)
    .bind(&order.display_name)
    .bind(&order.full_name)
    .bind(&order.phone)
    .bind(&order.city)
    .bind(&order.delivery_point)
    .bind(&order.products)
    .bind(order.total_price)
    .bind(order.is_upsell)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get an order by ID.
pub async fn get_order(pool: &SqlitePool, id: i64) -> Result<Order> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM orders WHERE id = ?",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Order",
        id: id.to_string(),
    })
}

/// Set an order's status.
pub async fn update_order_status(pool: &SqlitePool, id: i64, status: &str) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Order",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Attach a carrier tracking number and mark the order shipped.
pub async fn set_tracking_number(pool: &SqlitePool, id: i64, tracking_number: &str) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET tracking_number = ?, status = 'shipped' WHERE id = ?")
        .bind(tracking_number)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Order",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// A customer's orders, newest first.
pub async fn list_orders_for_customer(pool: &SqlitePool, customer_id: &str) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM orders WHERE customer_id = ? ORDER BY created_at DESC, id DESC",
        ORDER_COLUMNS
    ))
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// All orders in a given status, oldest first.
pub async fn list_orders_by_status(pool: &SqlitePool, status: &str) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM orders WHERE status = ? ORDER BY created_at ASC, id ASC",
        ORDER_COLUMNS
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::upsert_lead;
    use crate::models::{order_status, LeadUpdate};
    use crate::test_support::test_db;

    fn sample_order(customer: &str) -> NewOrder {
        NewOrder {
            customer_id: customer.to_string(),
            display_name: Some("Марія".to_string()),
            full_name: Some("Марія Коваленко".to_string()),
            phone: Some("0671234567".to_string()),
            city: Some("Київ".to_string()),
            delivery_point: Some("12".to_string()),
            products: "Шарф Осінь - 850 грн".to_string(),
            total_price: Some(850.0),
            is_upsell: false,
        }
    }

    #[tokio::test]
    async fn test_order_lifecycle() {
        let db = test_db().await;
        upsert_lead(db.pool(), "maria", &LeadUpdate::default()).await.unwrap();

        let id = create_order(db.pool(), &sample_order("maria")).await.unwrap();
        let order = get_order(db.pool(), id).await.unwrap();
        assert_eq!(order.status, order_status::NEW);
        assert_eq!(order.total_price, Some(850.0));
        assert!(!order.is_upsell);

        update_order_status(db.pool(), id, order_status::SALED).await.unwrap();
        assert_eq!(list_orders_by_status(db.pool(), order_status::SALED).await.unwrap().len(), 1);
        assert!(list_orders_by_status(db.pool(), order_status::NEW).await.unwrap().is_empty());

        set_tracking_number(db.pool(), id, "20450000000000").await.unwrap();
        let order = get_order(db.pool(), id).await.unwrap();
        assert_eq!(order.status, order_status::SHIPPED);
        assert_eq!(order.tracking_number.as_deref(), Some("20450000000000"));
    }

    #[tokio::test]
    async fn test_order_requires_lead() {
        let db = test_db().await;
        let result = create_order(db.pool(), &sample_order("ghost")).await;
        assert!(matches!(result, Err(DatabaseError::Sqlx(_))));
    }

    #[tokio::test]
    async fn test_list_orders_for_customer() {
        let db = test_db().await;
        upsert_lead(db.pool(), "maria", &LeadUpdate::default()).await.unwrap();

        let first = create_order(db.pool(), &sample_order("maria")).await.unwrap();
        let second = create_order(
            db.pool(),
            &NewOrder {
                is_upsell: true,
                ..sample_order("maria")
            },
        )
        .await
        .unwrap();

        let orders = list_orders_for_customer(db.pool(), "maria").await.unwrap();
        assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![second, first]);
        assert!(orders[0].is_upsell);
        assert!(matches!(update_order_status(db.pool(), 999, "saled").await, Err(DatabaseError::NotFound { .. })));
    }
}
