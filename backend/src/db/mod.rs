pub mod account_queries;
pub mod journal_queries;
pub mod order_queries;
pub mod price_queries;
pub mod reporting_queries;
pub mod source_queries;
pub mod transaction_queries;
pub mod watchlist_queries;
