use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::{journal_queries, source_queries, transaction_queries, watchlist_queries};
use crate::errors::AppError;
use crate::models::{AdviceSource, CreateDocument, Document, SaveAdviceSource, SaveSourceNote, SourceDetails, SourceNote};

fn validate_source(input: &SaveAdviceSource) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Source name cannot be empty"));
    }
    if input.source_type.trim().is_empty() {
        return Err(AppError::validation("Source type cannot be empty"));
    }
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Advice source {} not found", id))
}

pub async fn list(pool: &PgPool, holder: Option<Uuid>) -> Result<Vec<AdviceSource>, AppError> {
    Ok(source_queries::fetch_all(pool, holder).await?)
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<AdviceSource, AppError> {
    source_queries::fetch_one(pool, id).await?.ok_or_else(|| not_found(id))
}

pub async fn create(pool: &PgPool, input: SaveAdviceSource) -> Result<AdviceSource, AppError> {
    validate_source(&input)?;
    Ok(source_queries::create(pool, &input).await?)
}

pub async fn update(pool: &PgPool, id: Uuid, input: SaveAdviceSource) -> Result<AdviceSource, AppError> {
    validate_source(&input)?;
    source_queries::update(pool, id, &input).await?.ok_or_else(|| not_found(id))
}

/// Refuses while any transaction, journal entry, watchlist item or order points here.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let references = source_queries::count_references(pool, id).await?;
    if references > 0 {
        return Err(AppError::validation(format!(
            "Advice source is referenced by {} record(s)",
            references
        )));
    }
    match source_queries::delete(pool, id).await? {
        0 => Err(not_found(id)),
        _ => {
            info!("🗑️ Deleted advice source {}", id);
            Ok(())
        }
    }
}

pub async fn details(pool: &PgPool, id: Uuid) -> Result<SourceDetails, AppError> {
    let source = fetch_one(pool, id).await?;
    let (notes, documents, transactions, journal_entries, watchlist_items) = tokio::try_join!(
        source_queries::fetch_notes(pool, id),
        source_queries::fetch_documents(pool, id),
        transaction_queries::fetch_by_source(pool, id),
        journal_queries::fetch_by_source(pool, id),
        watchlist_queries::fetch_by_source(pool, id),
    )?;

    Ok(SourceDetails {
        source,
        notes,
        documents,
        transactions,
        journal_entries,
        watchlist_items,
    })
}

pub async fn add_note(pool: &PgPool, source_id: Uuid, input: SaveSourceNote) -> Result<SourceNote, AppError> {
    if input.note_content.trim().is_empty() {
        return Err(AppError::validation("Note cannot be empty"));
    }
    fetch_one(pool, source_id).await?;
    Ok(source_queries::add_note(pool, source_id, input.note_content.trim()).await?)
}

pub async fn update_note(
    pool: &PgPool,
    source_id: Uuid,
    note_id: Uuid,
    input: SaveSourceNote,
) -> Result<SourceNote, AppError> {
    if input.note_content.trim().is_empty() {
        return Err(AppError::validation("Note cannot be empty"));
    }
    source_queries::update_note(pool, source_id, note_id, input.note_content.trim())
        .await?
        .ok_or_else(|| AppError::not_found(format!("Note {} not found", note_id)))
}

pub async fn delete_note(pool: &PgPool, source_id: Uuid, note_id: Uuid) -> Result<(), AppError> {
    match source_queries::delete_note(pool, source_id, note_id).await? {
        0 => Err(AppError::not_found(format!("Note {} not found", note_id))),
        _ => Ok(()),
    }
}

pub async fn create_document(pool: &PgPool, input: CreateDocument) -> Result<Document, AppError> {
    if input.title.trim().is_empty() || input.external_link.trim().is_empty() {
        return Err(AppError::validation("Documents need a title and a link"));
    }
    if input.advice_source_id.is_none() && input.journal_entry_id.is_none() {
        return Err(AppError::validation("A document must belong to a source or a journal entry"));
    }
    Ok(source_queries::create_document(pool, &input).await?)
}

pub async fn delete_document(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    match source_queries::delete_document(pool, id).await? {
        0 => Err(AppError::not_found(format!("Document {} not found", id))),
        _ => Ok(()),
    }
}
