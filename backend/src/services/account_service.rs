use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::{account_queries, transaction_queries};
use crate::errors::AppError;
use crate::models::{AccountHolder, Exchange};

fn clean_name(name: &str, what: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation(format!("{} name cannot be empty", what)));
    }
    Ok(name.to_string())
}

/// Unique violations on `name` come back as 400s rather than 500s.
fn map_unique(e: sqlx::Error, name: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::validation(format!("'{}' already exists", name))
        }
        _ => AppError::from(e),
    }
}

/// Foreign-key violations on delete mean something still points at the row.
fn map_in_use(e: sqlx::Error, what: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::validation(format!("{} is still referenced and cannot be deleted", what))
        }
        _ => AppError::from(e),
    }
}

pub async fn list_holders(pool: &PgPool) -> Result<Vec<AccountHolder>, AppError> {
    Ok(account_queries::fetch_holders(pool).await?)
}

pub async fn create_holder(pool: &PgPool, name: &str) -> Result<AccountHolder, AppError> {
    let name = clean_name(name, "Account holder")?;
    account_queries::create_holder(pool, &name)
        .await
        .map_err(|e| map_unique(e, &name))
}

pub async fn rename_holder(pool: &PgPool, id: Uuid, name: &str) -> Result<AccountHolder, AppError> {
    let name = clean_name(name, "Account holder")?;
    account_queries::rename_holder(pool, id, &name)
        .await
        .map_err(|e| map_unique(e, &name))?
        .ok_or_else(|| AppError::not_found(format!("Account holder {} not found", id)))
}

pub async fn delete_holder(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let references = transaction_queries::count_by_holder(pool, id).await?;
    if references > 0 {
        return Err(AppError::validation(format!(
            "Account holder is referenced by {} transaction(s)",
            references
        )));
    }
    // Journal entries, watchlist items, sources and orders are caught by their foreign keys
    let deleted = account_queries::delete_holder(pool, id)
        .await
        .map_err(|e| map_in_use(e, "Account holder"))?;
    match deleted {
        0 => Err(AppError::not_found(format!("Account holder {} not found", id))),
        _ => {
            info!("🗑️ Deleted account holder {}", id);
            Ok(())
        }
    }
}

pub async fn list_exchanges(pool: &PgPool) -> Result<Vec<Exchange>, AppError> {
    Ok(account_queries::fetch_exchanges(pool).await?)
}

pub async fn create_exchange(pool: &PgPool, name: &str) -> Result<Exchange, AppError> {
    let name = clean_name(name, "Exchange")?.to_uppercase();
    account_queries::create_exchange(pool, &name)
        .await
        .map_err(|e| map_unique(e, &name))
}

pub async fn rename_exchange(pool: &PgPool, id: Uuid, name: &str) -> Result<Exchange, AppError> {
    let name = clean_name(name, "Exchange")?.to_uppercase();
    let current = account_queries::fetch_exchange(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Exchange {} not found", id)))?;

    // Transactions store the exchange by name
    let references = transaction_queries::count_by_exchange(pool, &current.name).await?;
    if references > 0 && current.name != name {
        return Err(AppError::validation(format!(
            "Exchange {} is referenced by {} transaction(s)",
            current.name, references
        )));
    }

    account_queries::rename_exchange(pool, id, &name)
        .await
        .map_err(|e| map_unique(e, &name))?
        .ok_or_else(|| AppError::not_found(format!("Exchange {} not found", id)))
}

pub async fn delete_exchange(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let exchange = account_queries::fetch_exchange(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Exchange {} not found", id)))?;

    let references = transaction_queries::count_by_exchange(pool, &exchange.name).await?;
    if references > 0 {
        return Err(AppError::validation(format!(
            "Exchange {} is referenced by {} transaction(s)",
            exchange.name, references
        )));
    }
    account_queries::delete_exchange(pool, id)
        .await
        .map_err(|e| map_in_use(e, "Exchange"))?;
    info!("🗑️ Deleted exchange {}", exchange.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    #[derive(Debug)]
    struct ConstraintError(ErrorKind);

    impl std::fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "constraint violated")
        }
    }

    impl std::error::Error for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError(kind)))
    }

    #[test]
    fn test_referenced_holder_delete_is_a_validation_error() {
        let err = map_in_use(db_error(ErrorKind::ForeignKeyViolation), "Account holder");
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("still referenced")));
    }

    #[test]
    fn test_other_delete_failures_stay_database_errors() {
        assert!(!matches!(map_in_use(sqlx::Error::RowNotFound, "Exchange"), AppError::Validation(_)));
        assert!(!matches!(
            map_in_use(db_error(ErrorKind::UniqueViolation), "Exchange"),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_duplicate_name_is_a_validation_error() {
        let err = map_unique(db_error(ErrorKind::UniqueViolation), "NASDAQ");
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("NASDAQ")));
    }
}
