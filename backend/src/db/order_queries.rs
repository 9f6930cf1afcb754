use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{CreatePendingOrder, Notification, OrderStatus, OrderType, PendingOrder, UpdatePendingOrder};

pub async fn fetch_active<'e, E: PgExecutor<'e>>(executor: E, holder: Option<Uuid>) -> Result<Vec<PendingOrder>, sqlx::Error> {
    sqlx::query_as::<_, PendingOrder>(
        r#"
        SELECT * FROM pending_orders
        WHERE status = 'ACTIVE' AND ($1::uuid IS NULL OR account_holder_id = $1)
        ORDER BY created_date DESC, ticker
        "#,
    )
    .bind(holder)
    .fetch_all(executor)
    .await
}

pub async fn fetch_one<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<PendingOrder>, sqlx::Error> {
    sqlx::query_as::<_, PendingOrder>("SELECT * FROM pending_orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn create<'e, E: PgExecutor<'e>>(executor: E, input: &CreatePendingOrder, ticker: &str) -> Result<PendingOrder, sqlx::Error> {
    sqlx::query_as::<_, PendingOrder>(
        r#"
        INSERT INTO pending_orders (
            id, account_holder_id, ticker, exchange, order_type, limit_price, quantity,
            created_date, expiration_date, status, notes, advice_source_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'ACTIVE', $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.account_holder_id)
    .bind(ticker)
    .bind(&input.exchange)
    .bind(input.order_type.unwrap_or(OrderType::BuyLimit))
    .bind(input.limit_price)
    .bind(input.quantity)
    .bind(input.created_date)
    .bind(input.expiration_date)
    .bind(&input.notes)
    .bind(input.advice_source_id)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, input: &UpdatePendingOrder) -> Result<Option<PendingOrder>, sqlx::Error> {
    sqlx::query_as::<_, PendingOrder>(
        r#"
        UPDATE pending_orders
        SET limit_price = $2, quantity = $3, expiration_date = $4, notes = $5
        WHERE id = $1 AND status = 'ACTIVE'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.limit_price)
    .bind(input.quantity)
    .bind(input.expiration_date)
    .bind(&input.notes)
    .fetch_optional(executor)
    .await
}

/// Moves an ACTIVE order to `status`; `None` when it was not active.
pub async fn set_status<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, status: OrderStatus) -> Result<Option<PendingOrder>, sqlx::Error> {
    sqlx::query_as::<_, PendingOrder>(
        "UPDATE pending_orders SET status = $2 WHERE id = $1 AND status = 'ACTIVE' RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

pub async fn fetch_unread_notifications<'e, E: PgExecutor<'e>>(executor: E, holder: Option<Uuid>) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE status = 'UNREAD' AND ($1::uuid IS NULL OR account_holder_id = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(holder)
    .fetch_all(executor)
    .await
}

pub async fn create_notification<'e, E: PgExecutor<'e>>(
    executor: E,
    account_holder_id: Uuid,
    pending_order_id: Option<Uuid>,
    message: &str,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, account_holder_id, pending_order_id, message, status)
        VALUES ($1, $2, $3, $4, 'UNREAD')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_holder_id)
    .bind(pending_order_id)
    .bind(message)
    .fetch_one(executor)
    .await
}

/// Notifies about a triggered order unless an UNREAD notification for it
/// already exists. `None` means one was already waiting.
pub async fn notify_order_once<'e, E: PgExecutor<'e>>(
    executor: E,
    account_holder_id: Uuid,
    pending_order_id: Uuid,
    message: &str,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, account_holder_id, pending_order_id, message, status)
        VALUES ($1, $2, $3, $4, 'UNREAD')
        ON CONFLICT (pending_order_id) WHERE status = 'UNREAD' AND pending_order_id IS NOT NULL
        DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_holder_id)
    .bind(pending_order_id)
    .bind(message)
    .fetch_optional(executor)
    .await
}

pub async fn dismiss_notification<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET status = 'DISMISSED' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_unread_order_notification_index_matches_conflict_target() {
        let migrator = sqlx::migrate!("./migrations");
        let schema: Vec<String> = migrator.iter().map(|m| m.sql.to_string()).collect();
        let schema = schema.join("\n");

        assert!(schema.contains("CREATE UNIQUE INDEX idx_notifications_unread_order"));
        assert!(schema.contains(
            "ON notifications (pending_order_id)\n    WHERE status = 'UNREAD' AND pending_order_id IS NOT NULL"
        ));
    }
}
