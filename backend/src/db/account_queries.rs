use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{AccountHolder, Exchange};

pub async fn fetch_holders<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<AccountHolder>, sqlx::Error> {
    sqlx::query_as::<_, AccountHolder>("SELECT id, name, created_at FROM account_holders ORDER BY name")
        .fetch_all(executor)
        .await
}

pub async fn fetch_holder<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<AccountHolder>, sqlx::Error> {
    sqlx::query_as::<_, AccountHolder>("SELECT id, name, created_at FROM account_holders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn create_holder<'e, E: PgExecutor<'e>>(executor: E, name: &str) -> Result<AccountHolder, sqlx::Error> {
    sqlx::query_as::<_, AccountHolder>(
        "INSERT INTO account_holders (id, name) VALUES ($1, $2) RETURNING id, name, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(executor)
    .await
}

pub async fn rename_holder<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, name: &str) -> Result<Option<AccountHolder>, sqlx::Error> {
    sqlx::query_as::<_, AccountHolder>(
        "UPDATE account_holders SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
    )
    .bind(id)
    .bind(name)
    .fetch_optional(executor)
    .await
}

pub async fn delete_holder<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM account_holders WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_exchanges<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Exchange>, sqlx::Error> {
    sqlx::query_as::<_, Exchange>("SELECT id, name FROM exchanges ORDER BY name")
        .fetch_all(executor)
        .await
}

pub async fn fetch_exchange<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Exchange>, sqlx::Error> {
    sqlx::query_as::<_, Exchange>("SELECT id, name FROM exchanges WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn create_exchange<'e, E: PgExecutor<'e>>(executor: E, name: &str) -> Result<Exchange, sqlx::Error> {
    sqlx::query_as::<_, Exchange>("INSERT INTO exchanges (id, name) VALUES ($1, $2) RETURNING id, name")
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(executor)
        .await
}

pub async fn rename_exchange<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, name: &str) -> Result<Option<Exchange>, sqlx::Error> {
    sqlx::query_as::<_, Exchange>("UPDATE exchanges SET name = $2 WHERE id = $1 RETURNING id, name")
        .bind(id)
        .bind(name)
        .fetch_optional(executor)
        .await
}

pub async fn delete_exchange<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exchanges WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
