use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::get;
use chrono::NaiveDate;
use tracing::{info, error};

use crate::errors::AppError;
use crate::models::{
    DailyPerformance, PortfolioOverviewRow, PositionsReport, RealizedPlRange, RealizedPlSummary, ReportQuery,
};
use crate::services::reporting_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily_performance/:date", get(get_daily_performance))
        .route("/positions/:date", get(get_positions))
        .route("/realized_pl", get(get_lifetime_realized_pl).post(get_realized_pl_for_range))
        .route("/portfolio/overview", get(get_portfolio_overview))
}

pub async fn get_daily_performance(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<DailyPerformance>, AppError> {
    info!("GET /reporting/daily_performance/{} - Computing daily performance", date);
    let performance = reporting_service::daily_performance(&state.pool, &state.prices, date, query.holder).await
        .map_err(|e| {
            error!("Failed to compute daily performance for {}: {}", date, e);
            e
        })?;
    Ok(Json(performance))
}

pub async fn get_positions(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PositionsReport>, AppError> {
    info!("GET /reporting/positions/{} - Building positions report", date);
    let report = reporting_service::positions(&state.pool, date, query.holder).await
        .map_err(|e| {
            error!("Failed to build positions for {}: {}", date, e);
            e
        })?;
    Ok(Json(report))
}

pub async fn get_lifetime_realized_pl(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<RealizedPlSummary>, AppError> {
    info!("GET /reporting/realized_pl - Lifetime realized P/L");
    let summary = reporting_service::realized_pl(&state.pool, query.holder, None, None).await
        .map_err(|e| {
            error!("Failed to compute realized P/L: {}", e);
            e
        })?;
    Ok(Json(summary))
}

pub async fn get_realized_pl_for_range(
    State(state): State<AppState>,
    Json(range): Json<RealizedPlRange>,
) -> Result<Json<RealizedPlSummary>, AppError> {
    info!("POST /reporting/realized_pl - Realized P/L {} to {}", range.start_date, range.end_date);
    let summary = reporting_service::realized_pl(
        &state.pool,
        range.holder,
        Some(range.start_date),
        Some(range.end_date),
    )
    .await
    .map_err(|e| {
        error!("Failed to compute realized P/L for range: {}", e);
        e
    })?;
    Ok(Json(summary))
}

pub async fn get_portfolio_overview(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<PortfolioOverviewRow>>, AppError> {
    info!("GET /reporting/portfolio/overview - Building portfolio overview");
    let rows = reporting_service::portfolio_overview(&state.pool, &state.prices, query.holder).await
        .map_err(|e| {
            error!("Failed to build portfolio overview: {}", e);
            e
        })?;
    Ok(Json(rows))
}
