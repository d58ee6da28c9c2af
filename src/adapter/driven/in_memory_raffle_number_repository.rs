use crate::domain::model::{
    Actor, ForceSaleAudit, ForceSaleResult, NumberSelection, NumberStatus, OverriddenNumber,
    RaffleId, RaffleNumber, TicketId, UserId,
};
use crate::domain::port::{BatchOutcome, RaffleNumberRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tokio::sync::Mutex;

/// 強制販売の監査記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    pub raffle_id: RaffleId,
    pub overridden: OverriddenNumber,
    pub ticket: TicketId,
    pub actor: Actor,
    pub audit: ForceSaleAudit,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    rows: BTreeMap<(RaffleId, u32), RaffleNumber>,
    overrides: Vec<OverrideRecord>,
}

impl Store {
    /// 表示対象の行を番号の昇順で取得する
    fn visible(&self, raffle_id: RaffleId) -> impl Iterator<Item = &RaffleNumber> {
        self.rows
            .range((raffle_id, 0)..=(raffle_id, u32::MAX))
            .map(|(_, row)| row)
            .filter(|row| row.is_visible())
    }

    fn select(&self, raffle_id: RaffleId, numbers: &[u32]) -> Vec<RaffleNumber> {
        numbers
            .iter()
            .filter_map(|n| self.rows.get(&(raffle_id, *n)))
            .filter(|row| row.is_visible())
            .cloned()
            .collect()
    }

    /// 全件に遷移を適用できる場合のみ書き込む
    fn apply_all(
        &mut self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        transition: impl Fn(&RaffleNumber) -> Option<RaffleNumber>,
    ) -> BatchOutcome {
        let current = self.select(raffle_id, selection.numbers());
        let found: Vec<u32> = current.iter().map(RaffleNumber::number).collect();
        let missing = selection.missing_from(&found);
        if !missing.is_empty() {
            return BatchOutcome::Missing(missing);
        }

        let mut updated = Vec::with_capacity(current.len());
        let mut rejected = Vec::new();
        for row in &current {
            match transition(row) {
                Some(next) => updated.push(next),
                None => rejected.push(row.number()),
            }
        }
        if !rejected.is_empty() {
            return BatchOutcome::Rejected(rejected);
        }

        for row in &updated {
            self.rows.insert((raffle_id, row.number()), row.clone());
        }
        BatchOutcome::Applied(updated)
    }
}

/// インメモリ抽選番号リポジトリ
/// テストやデータベースを使わない構成で使う
///
/// 一括操作は1つのロックの中で判定と書き込みを行うため、
/// MySQL実装の行ロック付き条件更新と同じく全件適用か無変更のどちらかになる。
#[derive(Default)]
pub struct InMemoryRaffleNumberRepository {
    store: Mutex<Store>,
}

impl InMemoryRaffleNumberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行をそのまま保存する（無効化・論理削除された行の用意に使う）
    pub async fn put(&self, row: RaffleNumber) {
        let mut store = self.store.lock().await;
        store.rows.insert((row.raffle_id(), row.number()), row);
    }

    /// 強制販売の監査記録を古い順に取得する
    pub async fn override_log(&self) -> Vec<OverrideRecord> {
        self.store.lock().await.overrides.clone()
    }
}

#[async_trait]
impl RaffleNumberRepository for InMemoryRaffleNumberRepository {
    async fn insert_available_numbers(
        &self,
        raffle_id: RaffleId,
        numbers: RangeInclusive<u32>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut store = self.store.lock().await;
        let mut inserted = 0;
        for number in numbers {
            store
                .rows
                .entry((raffle_id, number))
                .or_insert_with(|| {
                    inserted += 1;
                    RaffleNumber::new_available(raffle_id, number, actor, now)
                });
        }
        Ok(inserted)
    }

    async fn find_by_numbers(
        &self,
        raffle_id: RaffleId,
        numbers: &[u32],
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let store = self.store.lock().await;
        let mut rows = store.select(raffle_id, numbers);
        rows.sort_by_key(RaffleNumber::number);
        rows.dedup_by_key(|row| row.number());
        Ok(rows)
    }

    async fn find_all(&self, raffle_id: RaffleId) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.visible(raffle_id).cloned().collect())
    }

    async fn find_by_status(
        &self,
        raffle_id: RaffleId,
        status: NumberStatus,
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store
            .visible(raffle_id)
            .filter(|row| row.status() == status)
            .cloned()
            .collect())
    }

    async fn find_held_by(
        &self,
        raffle_id: RaffleId,
        holder: UserId,
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store
            .visible(raffle_id)
            .filter(|row| row.is_held_by(holder))
            .cloned()
            .collect())
    }

    async fn hold_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        holder: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut store = self.store.lock().await;
        Ok(store.apply_all(raffle_id, selection, |row| {
            row.hold(holder, expires_at, now).ok()
        }))
    }

    async fn sell_held_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        holder: UserId,
        ticket: TicketId,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut store = self.store.lock().await;
        Ok(store.apply_all(raffle_id, selection, |row| {
            row.sell(holder, ticket, now).ok()
        }))
    }

    async fn force_sell_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        ticket: TicketId,
        actor: Actor,
        audit: &ForceSaleAudit,
        now: DateTime<Utc>,
    ) -> Result<ForceSaleResult, RepositoryError> {
        let mut store = self.store.lock().await;
        let current = store.select(raffle_id, selection.numbers());
        let found: Vec<u32> = current.iter().map(RaffleNumber::number).collect();
        let mut result = ForceSaleResult {
            missing: selection.missing_from(&found),
            ..ForceSaleResult::default()
        };

        for row in &current {
            match row.force_sell(ticket, actor, now) {
                Ok(sold) => {
                    let overridden = OverriddenNumber::from_previous(row);
                    store.overrides.push(OverrideRecord {
                        raffle_id,
                        overridden,
                        ticket,
                        actor,
                        audit: audit.clone(),
                        recorded_at: now,
                    });
                    store.rows.insert((raffle_id, sold.number()), sold.clone());
                    result.overridden.push(overridden);
                    result.sold.push(sold);
                }
                Err(_) => result.already_sold.push(row.number()),
            }
        }
        Ok(result)
    }

    async fn release_expired_holds(
        &self,
        raffle_id: Option<RaffleId>,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut store = self.store.lock().await;
        let mut released = 0;
        for ((row_raffle, _), row) in store.rows.iter_mut() {
            if raffle_id.is_some_and(|id| id != *row_raffle) || !row.is_visible() {
                continue;
            }
            if let Ok(next) = row.release_expired(now) {
                *row = next;
                released += 1;
            }
        }
        Ok(released)
    }
}
