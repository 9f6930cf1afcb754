use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{JournalEntry, Transaction, WatchlistItem};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdviceSource {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub name: String,
    pub source_type: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAdviceSource {
    pub account_holder_id: Uuid,
    pub name: String,
    pub source_type: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceQuery {
    pub holder: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SourceNote {
    pub id: Uuid,
    pub advice_source_id: Uuid,
    pub note_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSourceNote {
    pub note_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub advice_source_id: Option<Uuid>,
    pub journal_entry_id: Option<Uuid>,
    pub title: String,
    pub external_link: String,
    pub document_type: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocument {
    pub advice_source_id: Option<Uuid>,
    pub journal_entry_id: Option<Uuid>,
    pub title: String,
    pub external_link: String,
    pub document_type: Option<String>,
    pub description: Option<String>,
}

/// Everything hanging off one advice source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDetails {
    pub source: AdviceSource,
    pub notes: Vec<SourceNote>,
    pub documents: Vec<Document>,
    pub transactions: Vec<Transaction>,
    pub journal_entries: Vec<JournalEntry>,
    pub watchlist_items: Vec<WatchlistItem>,
}
