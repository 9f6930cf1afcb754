use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use portfolio_tracker::app;
use portfolio_tracker::config::{AppConfig, PriceProviderKind};
use portfolio_tracker::external::finnhub::FinnhubProvider;
use portfolio_tracker::external::price_provider::PriceProvider;
use portfolio_tracker::external::twelvedata::TwelveDataProvider;
use portfolio_tracker::logging::{init_logging, LoggingConfig};
use portfolio_tracker::services::csv_import_service::ImportSessions;
use portfolio_tracker::services::job_scheduler_service::JobSchedulerService;
use portfolio_tracker::services::price_service::PriceService;
use portfolio_tracker::services::rate_limiter::RateLimiter;
use portfolio_tracker::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("✅ Database migrations applied");

    let provider: Option<Arc<dyn PriceProvider>> = match config.prices.provider {
        PriceProviderKind::Finnhub => {
            tracing::info!("📊 Using price provider: Finnhub");
            Some(Arc::new(FinnhubProvider::from_env()?))
        }
        PriceProviderKind::TwelveData => {
            tracing::info!("📊 Using price provider: Twelve Data");
            Some(Arc::new(TwelveDataProvider::from_env()?))
        }
        PriceProviderKind::None => {
            tracing::warn!("⚠️ No price provider configured, live prices are unavailable");
            None
        }
    };

    let limiter = RateLimiter::new(config.prices.max_concurrent, config.prices.requests_per_minute);
    let prices = Arc::new(PriceService::new(provider, limiter, config.prices.cache_ttl));

    let mut scheduler = if config.jobs.enabled {
        let mut scheduler = JobSchedulerService::new(pool.clone(), prices.clone(), config.jobs.clone()).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("⏸️ Job scheduler disabled");
        None
    };

    let state = AppState {
        pool,
        prices,
        import_sessions: Arc::new(ImportSessions::new()),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Portfolio tracker backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop().await?;
    }

    Ok(())
}
