use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{AdviceSource, CreateDocument, Document, SaveAdviceSource, SourceNote};

pub async fn fetch_all<'e, E: PgExecutor<'e>>(executor: E, holder: Option<Uuid>) -> Result<Vec<AdviceSource>, sqlx::Error> {
    sqlx::query_as::<_, AdviceSource>(
        r#"
        SELECT * FROM advice_sources
        WHERE ($1::uuid IS NULL OR account_holder_id = $1)
        ORDER BY name
        "#,
    )
    .bind(holder)
    .fetch_all(executor)
    .await
}

pub async fn fetch_one<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<AdviceSource>, sqlx::Error> {
    sqlx::query_as::<_, AdviceSource>("SELECT * FROM advice_sources WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn create<'e, E: PgExecutor<'e>>(executor: E, input: &SaveAdviceSource) -> Result<AdviceSource, sqlx::Error> {
    sqlx::query_as::<_, AdviceSource>(
        r#"
        INSERT INTO advice_sources (
            id, account_holder_id, name, source_type, description, url,
            contact_person, contact_email, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.account_holder_id)
    .bind(input.name.trim())
    .bind(&input.source_type)
    .bind(&input.description)
    .bind(&input.url)
    .bind(&input.contact_person)
    .bind(&input.contact_email)
    .bind(input.is_active.unwrap_or(true))
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, input: &SaveAdviceSource) -> Result<Option<AdviceSource>, sqlx::Error> {
    sqlx::query_as::<_, AdviceSource>(
        r#"
        UPDATE advice_sources
        SET name = $2, source_type = $3, description = $4, url = $5,
            contact_person = $6, contact_email = $7, is_active = $8
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.name.trim())
    .bind(&input.source_type)
    .bind(&input.description)
    .bind(&input.url)
    .bind(&input.contact_person)
    .bind(&input.contact_email)
    .bind(input.is_active.unwrap_or(true))
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM advice_sources WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Rows in other tables that point at this source.
pub async fn count_references<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT (SELECT COUNT(*) FROM transactions WHERE advice_source_id = $1)
             + (SELECT COUNT(*) FROM journal_entries WHERE advice_source_id = $1)
             + (SELECT COUNT(*) FROM watchlist WHERE advice_source_id = $1)
             + (SELECT COUNT(*) FROM pending_orders WHERE advice_source_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

pub async fn fetch_notes<'e, E: PgExecutor<'e>>(executor: E, source_id: Uuid) -> Result<Vec<SourceNote>, sqlx::Error> {
    sqlx::query_as::<_, SourceNote>(
        "SELECT * FROM source_notes WHERE advice_source_id = $1 ORDER BY created_at DESC",
    )
    .bind(source_id)
    .fetch_all(executor)
    .await
}

pub async fn add_note<'e, E: PgExecutor<'e>>(executor: E, source_id: Uuid, content: &str) -> Result<SourceNote, sqlx::Error> {
    sqlx::query_as::<_, SourceNote>(
        r#"
        INSERT INTO source_notes (id, advice_source_id, note_content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(source_id)
    .bind(content)
    .fetch_one(executor)
    .await
}

pub async fn update_note<'e, E: PgExecutor<'e>>(
    executor: E,
    source_id: Uuid,
    note_id: Uuid,
    content: &str,
) -> Result<Option<SourceNote>, sqlx::Error> {
    sqlx::query_as::<_, SourceNote>(
        r#"
        UPDATE source_notes SET note_content = $3, updated_at = NOW()
        WHERE id = $2 AND advice_source_id = $1
        RETURNING *
        "#,
    )
    .bind(source_id)
    .bind(note_id)
    .bind(content)
    .fetch_optional(executor)
    .await
}

pub async fn delete_note<'e, E: PgExecutor<'e>>(executor: E, source_id: Uuid, note_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM source_notes WHERE id = $2 AND advice_source_id = $1")
        .bind(source_id)
        .bind(note_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_documents<'e, E: PgExecutor<'e>>(executor: E, source_id: Uuid) -> Result<Vec<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        "SELECT * FROM documents WHERE advice_source_id = $1 ORDER BY created_at DESC",
    )
    .bind(source_id)
    .fetch_all(executor)
    .await
}

pub async fn create_document<'e, E: PgExecutor<'e>>(executor: E, input: &CreateDocument) -> Result<Document, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents (
            id, advice_source_id, journal_entry_id, title, external_link, document_type, description
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.advice_source_id)
    .bind(input.journal_entry_id)
    .bind(input.title.trim())
    .bind(input.external_link.trim())
    .bind(&input.document_type)
    .bind(&input.description)
    .fetch_one(executor)
    .await
}

pub async fn delete_document<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
