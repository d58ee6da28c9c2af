use crate::adapter::database_config::{env_or, ConfigError};
use crate::application::service::ReservationPolicy;
use crate::domain::model::{HoldTtl, NumberSelection};
use std::time::Duration;

/// MySQLのプレースホルダ数の上限に収まる1回あたりの作成行数の上限
const MAX_INSERT_CHUNK_SIZE: u32 = 5000;

/// 予約在庫サービスの実行設定
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    pub policy: ReservationPolicy,
    /// 期限切れ予約を回収する間隔
    pub reclaim_interval: Duration,
    /// HTTPサーバーの待ち受けアドレス
    pub server_addr: String,
}

impl ReservationConfig {
    /// 環境変数から設定を読み取る
    ///
    /// | 変数 | 既定値 |
    /// |---|---|
    /// | `HOLD_TTL_MINUTES` | 15 |
    /// | `MAX_HOLD_TTL_MINUTES` | 1440 |
    /// | `MAX_NUMBERS_PER_REQUEST` | 100 |
    /// | `NUMBER_INSERT_CHUNK_SIZE` | 1000 |
    /// | `RECLAIM_INTERVAL_SECONDS` | 60 |
    /// | `SERVER_ADDR` | 0.0.0.0:3000 |
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_ttl_minutes = env_or("MAX_HOLD_TTL_MINUTES", HoldTtl::DEFAULT_MAX_MINUTES)?;
        let default_ttl_minutes = env_or("HOLD_TTL_MINUTES", i64::from(HoldTtl::DEFAULT_MINUTES))?;
        let default_ttl = HoldTtl::from_minutes(default_ttl_minutes, max_ttl_minutes)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid HOLD_TTL_MINUTES: {}", e)))?;

        let max_numbers_per_request =
            env_or("MAX_NUMBERS_PER_REQUEST", NumberSelection::DEFAULT_MAX_NUMBERS)?;
        if max_numbers_per_request == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_NUMBERS_PER_REQUEST must be at least 1".to_string(),
            ));
        }

        let insert_chunk_size = env_or("NUMBER_INSERT_CHUNK_SIZE", 1000u32)?;
        if !(1..=MAX_INSERT_CHUNK_SIZE).contains(&insert_chunk_size) {
            return Err(ConfigError::InvalidValue(format!(
                "NUMBER_INSERT_CHUNK_SIZE must be between 1 and {}",
                MAX_INSERT_CHUNK_SIZE
            )));
        }

        let reclaim_seconds = env_or("RECLAIM_INTERVAL_SECONDS", 60u64)?;
        if reclaim_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "RECLAIM_INTERVAL_SECONDS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            policy: ReservationPolicy {
                default_ttl,
                max_ttl_minutes,
                max_numbers_per_request,
                insert_chunk_size,
            },
            reclaim_interval: Duration::from_secs(reclaim_seconds),
            server_addr: env_or("SERVER_ADDR", "0.0.0.0:3000".to_string())?,
        })
    }
}
