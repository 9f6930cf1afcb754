pub mod account_service;
pub mod backup_service;
pub mod csv_import_service;
pub mod import_templates;
pub mod job_scheduler_service;
pub mod journal_service;
pub mod order_service;
pub mod price_service;
pub mod rate_limiter;
pub mod reporting_service;
pub mod source_service;
pub mod transaction_service;
pub mod watchlist_service;
