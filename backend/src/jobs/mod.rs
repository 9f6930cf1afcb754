//! Scheduled background jobs.
//!
//! Each job takes a `JobContext` and returns a `JobResult`; the scheduler
//! records every run in `job_runs`.
//!
//! - `order_watcher_job` - pending buy limits and lot take-profit/stop-loss
//! - `eod_capture_job` - closing prices into `historical_prices`
//! - `backup_job` - CSV export of the transaction ledger

pub mod backup_job;
pub mod eod_capture_job;
pub mod order_watcher_job;
