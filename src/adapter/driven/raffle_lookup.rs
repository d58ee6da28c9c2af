use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{RaffleId, RaffleInfo};
use crate::domain::port::{RaffleLookup, RepositoryError};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// MySQL抽選参照
/// 抽選管理が所有する `raffles` テーブルを読み取り専用で参照する
#[derive(Clone)]
pub struct MySqlRaffleLookup {
    pool: Pool<MySql>,
}

impl MySqlRaffleLookup {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RaffleLookup for MySqlRaffleLookup {
    async fn find_raffle(&self, raffle_id: RaffleId) -> Result<Option<RaffleInfo>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, total_numbers, enabled, deleted FROM raffles WHERE id = ?",
        )
        .bind(raffle_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("抽選の取得に失敗しました: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fetch = |e: sqlx::Error| RepositoryError::FetchFailed(format!("抽選の復元に失敗しました: {}", e));
        Ok(Some(RaffleInfo {
            id: raffle_id,
            total_numbers: row.try_get("total_numbers").map_err(fetch)?,
            enabled: row.try_get("enabled").map_err(fetch)?,
            deleted: row.try_get("deleted").map_err(fetch)?,
        }))
    }
}

/// インメモリ抽選参照
/// テストやデータベースを使わない構成で使う
#[derive(Default)]
pub struct InMemoryRaffleLookup {
    raffles: RwLock<HashMap<RaffleId, RaffleInfo>>,
}

impl InMemoryRaffleLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// 抽選を登録する（同じIDがあれば置き換える）
    pub async fn insert(&self, raffle: RaffleInfo) {
        self.raffles.write().await.insert(raffle.id, raffle);
    }
}

#[async_trait]
impl RaffleLookup for InMemoryRaffleLookup {
    async fn find_raffle(&self, raffle_id: RaffleId) -> Result<Option<RaffleInfo>, RepositoryError> {
        Ok(self.raffles.read().await.get(&raffle_id).copied())
    }
}
