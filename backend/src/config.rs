use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which upstream quote API the price service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceProviderKind {
    Finnhub,
    TwelveData,
    None,
}

impl FromStr for PriceProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finnhub" => Ok(PriceProviderKind::Finnhub),
            "twelvedata" => Ok(PriceProviderKind::TwelveData),
            "none" | "" => Ok(PriceProviderKind::None),
            other => Err(format!(
                "Invalid PRICE_PROVIDER: {}. Must be 'finnhub', 'twelvedata', or 'none'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub provider: PriceProviderKind,
    pub cache_ttl: Duration,
    pub requests_per_minute: u32,
    pub max_concurrent: usize,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub enabled: bool,
    pub order_watcher_cron: String,
    pub eod_capture_cron: String,
    pub backup_cron: String,
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub prices: PriceConfig,
    pub jobs: JobConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let provider = env_or("PRICE_PROVIDER", "finnhub").parse::<PriceProviderKind>()?;

        let config = Self {
            database_url,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            prices: PriceConfig {
                provider,
                cache_ttl: Duration::from_secs(env_parse("PRICE_CACHE_TTL_SECS", 60)),
                requests_per_minute: env_parse("PRICE_REQUESTS_PER_MINUTE", 60),
                max_concurrent: env_parse("PRICE_MAX_CONCURRENT", 2),
            },
            jobs: JobConfig {
                enabled: env_parse("JOB_SCHEDULER_ENABLED", true),
                // sec min hour day month weekday
                order_watcher_cron: env_or("ORDER_WATCHER_CRON", "0 */5 * * * *"),
                eod_capture_cron: env_or("EOD_CAPTURE_CRON", "0 15 16 * * MON-FRI"),
                backup_cron: env_or("BACKUP_CRON", "0 0 2 * * *"),
                backup_dir: PathBuf::from(env_or("BACKUP_DIR", "backups")),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.prices.requests_per_minute == 0 {
            return Err("PRICE_REQUESTS_PER_MINUTE must be greater than 0".to_string());
        }
        if self.prices.max_concurrent == 0 {
            return Err("PRICE_MAX_CONCURRENT must be greater than 0".to_string());
        }
        if self.db_max_connections == 0 {
            return Err("DB_MAX_CONNECTIONS must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names() {
        assert_eq!("Finnhub".parse::<PriceProviderKind>(), Ok(PriceProviderKind::Finnhub));
        assert_eq!("twelvedata".parse::<PriceProviderKind>(), Ok(PriceProviderKind::TwelveData));
        assert_eq!("none".parse::<PriceProviderKind>(), Ok(PriceProviderKind::None));
        assert!("yahoo".parse::<PriceProviderKind>().is_err());
    }

    #[test]
    fn rejects_zero_rate_limits() {
        let mut config = AppConfig {
            database_url: "postgres://localhost/tracker".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            db_max_connections: 5,
            prices: PriceConfig {
                provider: PriceProviderKind::None,
                cache_ttl: Duration::from_secs(60),
                requests_per_minute: 60,
                max_concurrent: 2,
            },
            jobs: JobConfig {
                enabled: false,
                order_watcher_cron: "0 */5 * * * *".to_string(),
                eod_capture_cron: "0 15 16 * * *".to_string(),
                backup_cron: "0 0 2 * * *".to_string(),
                backup_dir: PathBuf::from("backups"),
            },
        };
        assert!(config.validate().is_ok());

        config.prices.max_concurrent = 0;
        assert!(config.validate().is_err());
    }
}
