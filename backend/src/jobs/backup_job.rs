use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::services::backup_service;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn backup_ledger(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("💾 Starting ledger backup");
    let today = Utc::now().date_naive();

    let (_, count) = backup_service::export_ledger(&ctx.pool, &ctx.backup_dir, today)
        .await
        .map_err(|e| AppError::External(format!("{:#}", e)))?;

    Ok(JobResult {
        items_processed: count as i32,
        items_failed: 0,
    })
}
