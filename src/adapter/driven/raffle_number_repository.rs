use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Actor, AuditStamp, ForceSaleAudit, ForceSaleResult, NumberSelection, NumberStatus,
    OverriddenNumber, RaffleId, RaffleNumber, RaffleNumberId, SystemPrincipal, TicketId, UserId,
};
use crate::domain::port::{BatchOutcome, RaffleNumberRepository, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;
use uuid::Uuid;

// MySQL関連のインポート
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, Pool, QueryBuilder, Row, Transaction};

const COLUMNS: &str = "id, raffle_id, number, status, holder_id, hold_expires_at, ticket_id, \
                       enabled, deleted, created_by, created_at, updated_by, updated_at";

/// 論理削除・無効化された行を除外する条件
const VISIBLE: &str = "enabled = TRUE AND deleted = FALSE";

fn query_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| RepositoryError::from(DatabaseError::QueryError(format!("{}: {}", context, e)))
}

fn decode_error(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::FetchFailed(format!("抽選番号の復元に失敗しました: {}", e))
}

/// 取得した行からドメインの抽選番号を復元する
fn row_to_number(row: &MySqlRow) -> Result<RaffleNumber, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let raffle_id: String = row.try_get("raffle_id").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let holder_id: Option<String> = row.try_get("holder_id").map_err(decode_error)?;
    let ticket_id: Option<String> = row.try_get("ticket_id").map_err(decode_error)?;
    let created_by: String = row.try_get("created_by").map_err(decode_error)?;
    let updated_by: String = row.try_get("updated_by").map_err(decode_error)?;

    let audit = AuditStamp {
        created_by: Actor::from_string(&created_by).map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_by: Actor::from_string(&updated_by).map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    };

    RaffleNumber::reconstruct(
        RaffleNumberId::from_string(&id).map_err(decode_error)?,
        RaffleId::from_string(&raffle_id).map_err(decode_error)?,
        row.try_get::<u32, _>("number").map_err(decode_error)?,
        NumberStatus::from_string(&status).map_err(decode_error)?,
        holder_id
            .as_deref()
            .map(UserId::from_string)
            .transpose()
            .map_err(decode_error)?,
        row.try_get::<Option<DateTime<Utc>>, _>("hold_expires_at")
            .map_err(decode_error)?,
        ticket_id
            .as_deref()
            .map(TicketId::from_string)
            .transpose()
            .map_err(decode_error)?,
        row.try_get("enabled").map_err(decode_error)?,
        row.try_get("deleted").map_err(decode_error)?,
        audit,
    )
    .map_err(decode_error)
}

/// `number IN (...)` の括弧内をバインド変数として追加する
fn push_number_list(builder: &mut QueryBuilder<'_, MySql>, numbers: &[u32]) {
    builder.push(" AND number IN (");
    let mut separated = builder.separated(", ");
    for number in numbers {
        separated.push_bind(*number);
    }
    separated.push_unseparated(")");
}

/// MySQL抽選番号リポジトリ
/// MySQLデータベースを使用して番号在庫を永続化する
///
/// 状態遷移は `SELECT ... FOR UPDATE` で対象行をロックしたうえで、
/// 現在の状態を条件にした `UPDATE` を同一トランザクション内で実行する。
/// 条件を満たさない行が1件でもあればロールバックする。
#[derive(Clone)]
pub struct MySqlRaffleNumberRepository {
    pool: Pool<MySql>,
}

impl MySqlRaffleNumberRepository {
    /// 新しいMySQL抽選番号リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, MySql>, RepositoryError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepositoryError::from(DatabaseError::ConnectionError(format!(
                "トランザクションの開始に失敗しました: {}",
                e
            ))))
    }

    async fn commit(tx: Transaction<'static, MySql>) -> Result<(), RepositoryError> {
        tx.commit()
            .await
            .map_err(query_error("トランザクションのコミットに失敗しました"))
    }

    async fn rollback(tx: Transaction<'static, MySql>) -> Result<(), RepositoryError> {
        tx.rollback()
            .await
            .map_err(query_error("トランザクションのロールバックに失敗しました"))
    }

    /// 指定された番号の行を排他ロック付きで取得する
    async fn lock_numbers(
        conn: &mut MySqlConnection,
        raffle_id: RaffleId,
        numbers: &[u32],
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let mut builder = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM raffle_numbers WHERE {} AND raffle_id = ",
            COLUMNS, VISIBLE
        ));
        builder.push_bind(raffle_id.to_string());
        push_number_list(&mut builder, numbers);
        builder.push(" ORDER BY number ASC FOR UPDATE");

        let rows = builder
            .build()
            .fetch_all(conn)
            .await
            .map_err(query_error("抽選番号のロックに失敗しました"))?;
        rows.iter().map(row_to_number).collect()
    }

    /// 競合で更新件数が足りなかった場合に、条件を満たさなかった番号を取得し直す
    async fn recheck(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        accepts: impl Fn(&RaffleNumber) -> bool,
    ) -> Result<BatchOutcome, RepositoryError> {
        let current = self.find_by_numbers(raffle_id, selection.numbers()).await?;
        let found: Vec<u32> = current.iter().map(RaffleNumber::number).collect();
        let missing = selection.missing_from(&found);
        if !missing.is_empty() {
            return Ok(BatchOutcome::Missing(missing));
        }
        let rejected: Vec<u32> = current
            .iter()
            .filter(|n| !accepts(n))
            .map(RaffleNumber::number)
            .collect();
        // 取得し直した時点で条件を満たしていても、更新は取り消し済みのため全件を競合として返す
        if rejected.is_empty() {
            return Ok(BatchOutcome::Rejected(selection.numbers().to_vec()));
        }
        Ok(BatchOutcome::Rejected(rejected))
    }
}

#[async_trait]
impl RaffleNumberRepository for MySqlRaffleNumberRepository {
    async fn insert_available_numbers(
        &self,
        raffle_id: RaffleId,
        numbers: RangeInclusive<u32>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        if numbers.is_empty() {
            return Ok(0);
        }

        // (raffle_id, number) の一意制約に当たった行は無視する
        let mut builder = QueryBuilder::<MySql>::new(
            "INSERT IGNORE INTO raffle_numbers \
             (id, raffle_id, number, status, enabled, deleted, created_by, created_at, updated_by, updated_at) ",
        );
        let actor = actor.to_string();
        builder.push_values(numbers, |mut b, number| {
            b.push_bind(Uuid::new_v4().to_string())
                .push_bind(raffle_id.to_string())
                .push_bind(number)
                .push_bind(NumberStatus::Available.as_str())
                .push_bind(true)
                .push_bind(false)
                .push_bind(actor.clone())
                .push_bind(now)
                .push_bind(actor.clone())
                .push_bind(now);
        });

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_error("抽選番号の作成に失敗しました"))?;
        Ok(result.rows_affected())
    }

    async fn find_by_numbers(
        &self,
        raffle_id: RaffleId,
        numbers: &[u32],
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        if numbers.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM raffle_numbers WHERE {} AND raffle_id = ",
            COLUMNS, VISIBLE
        ));
        builder.push_bind(raffle_id.to_string());
        push_number_list(&mut builder, numbers);
        builder.push(" ORDER BY number ASC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("抽選番号の取得に失敗しました"))?;
        rows.iter().map(row_to_number).collect()
    }

    async fn find_all(&self, raffle_id: RaffleId) -> Result<Vec<RaffleNumber>, RepositoryError> {
        // 番号の昇順で並べる
        let sql = format!(
            "SELECT {} FROM raffle_numbers WHERE {} AND raffle_id = ? ORDER BY number ASC",
            COLUMNS, VISIBLE
        );
        let rows = sqlx::query(&sql)
            .bind(raffle_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("抽選番号一覧の取得に失敗しました"))?;
        rows.iter().map(row_to_number).collect()
    }

    async fn find_by_status(
        &self,
        raffle_id: RaffleId,
        status: NumberStatus,
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM raffle_numbers WHERE {} AND raffle_id = ? AND status = ? ORDER BY number ASC",
            COLUMNS, VISIBLE
        );
        let rows = sqlx::query(&sql)
            .bind(raffle_id.to_string())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("ステータス別の抽選番号の取得に失敗しました"))?;
        rows.iter().map(row_to_number).collect()
    }

    async fn find_held_by(
        &self,
        raffle_id: RaffleId,
        holder: UserId,
    ) -> Result<Vec<RaffleNumber>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM raffle_numbers WHERE {} AND raffle_id = ? AND status = 'HELD' AND holder_id = ? \
             ORDER BY number ASC",
            COLUMNS, VISIBLE
        );
        let rows = sqlx::query(&sql)
            .bind(raffle_id.to_string())
            .bind(holder.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("予約中の抽選番号の取得に失敗しました"))?;
        rows.iter().map(row_to_number).collect()
    }

    async fn hold_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        holder: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut tx = self.begin().await?;
        let current = Self::lock_numbers(&mut tx, raffle_id, selection.numbers()).await?;

        let found: Vec<u32> = current.iter().map(RaffleNumber::number).collect();
        let missing = selection.missing_from(&found);
        if !missing.is_empty() {
            Self::rollback(tx).await?;
            return Ok(BatchOutcome::Missing(missing));
        }
        let unavailable: Vec<u32> = current
            .iter()
            .filter(|n| !n.is_available())
            .map(RaffleNumber::number)
            .collect();
        if !unavailable.is_empty() {
            Self::rollback(tx).await?;
            return Ok(BatchOutcome::Rejected(unavailable));
        }

        let updated = current
            .iter()
            .map(|n| n.hold(holder, expires_at, now))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::OperationFailed(e.to_string()))?;

        // 利用可能な行だけを予約中に変更する条件付き更新
        let mut builder = QueryBuilder::<MySql>::new("UPDATE raffle_numbers SET status = 'HELD', holder_id = ");
        builder
            .push_bind(holder.to_string())
            .push(", hold_expires_at = ")
            .push_bind(expires_at)
            .push(", updated_by = ")
            .push_bind(Actor::User(holder).to_string())
            .push(", updated_at = ")
            .push_bind(now)
            .push(format!(" WHERE {} AND status = 'AVAILABLE' AND raffle_id = ", VISIBLE))
            .push_bind(raffle_id.to_string());
        push_number_list(&mut builder, selection.numbers());

        let affected = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(query_error("抽選番号の予約に失敗しました"))?
            .rows_affected();

        if affected != selection.len() as u64 {
            Self::rollback(tx).await?;
            return self.recheck(raffle_id, selection, RaffleNumber::is_available).await;
        }

        Self::commit(tx).await?;
        Ok(BatchOutcome::Applied(updated))
    }

    async fn sell_held_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        holder: UserId,
        ticket: TicketId,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut tx = self.begin().await?;
        let current = Self::lock_numbers(&mut tx, raffle_id, selection.numbers()).await?;

        let found: Vec<u32> = current.iter().map(RaffleNumber::number).collect();
        let missing = selection.missing_from(&found);
        if !missing.is_empty() {
            Self::rollback(tx).await?;
            return Ok(BatchOutcome::Missing(missing));
        }
        let not_held: Vec<u32> = current
            .iter()
            .filter(|n| !n.is_held_by(holder))
            .map(RaffleNumber::number)
            .collect();
        if !not_held.is_empty() {
            Self::rollback(tx).await?;
            return Ok(BatchOutcome::Rejected(not_held));
        }

        let updated = current
            .iter()
            .map(|n| n.sell(holder, ticket, now))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::OperationFailed(e.to_string()))?;

        // 同じ保持者が予約中の行だけを販売済みに変更する条件付き更新
        let mut builder = QueryBuilder::<MySql>::new(
            "UPDATE raffle_numbers SET status = 'SOLD', holder_id = NULL, hold_expires_at = NULL, ticket_id = ",
        );
        builder
            .push_bind(ticket.to_string())
            .push(", updated_by = ")
            .push_bind(Actor::User(holder).to_string())
            .push(", updated_at = ")
            .push_bind(now)
            .push(format!(" WHERE {} AND status = 'HELD' AND holder_id = ", VISIBLE))
            .push_bind(holder.to_string())
            .push(" AND raffle_id = ")
            .push_bind(raffle_id.to_string());
        push_number_list(&mut builder, selection.numbers());

        let affected = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(query_error("抽選番号の販売確定に失敗しました"))?
            .rows_affected();

        if affected != selection.len() as u64 {
            Self::rollback(tx).await?;
            return self
                .recheck(raffle_id, selection, |n| n.is_held_by(holder))
                .await;
        }

        Self::commit(tx).await?;
        Ok(BatchOutcome::Applied(updated))
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
        let mut tx = self.begin().await?;
        let current = Self::lock_numbers(&mut tx, raffle_id, selection.numbers()).await?;

        let found: Vec<u32> = current.iter().map(RaffleNumber::number).collect();
        let mut result = ForceSaleResult {
            missing: selection.missing_from(&found),
            ..ForceSaleResult::default()
        };

        for number in &current {
            match number.force_sell(ticket, actor, now) {
                Ok(sold) => {
                    result.overridden.push(OverriddenNumber::from_previous(number));
                    result.sold.push(sold);
                }
                Err(_) => result.already_sold.push(number.number()),
            }
        }

        if result.sold.is_empty() {
            Self::rollback(tx).await?;
            return Ok(result);
        }

        let targets: Vec<u32> = result.sold.iter().map(RaffleNumber::number).collect();
        let mut builder = QueryBuilder::<MySql>::new(
            "UPDATE raffle_numbers SET status = 'SOLD', holder_id = NULL, hold_expires_at = NULL, ticket_id = ",
        );
        builder
            .push_bind(ticket.to_string())
            .push(", updated_by = ")
            .push_bind(actor.to_string())
            .push(", updated_at = ")
            .push_bind(now)
            .push(format!(" WHERE {} AND status <> 'SOLD' AND raffle_id = ", VISIBLE))
            .push_bind(raffle_id.to_string());
        push_number_list(&mut builder, &targets);

        let affected = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(query_error("抽選番号の強制販売に失敗しました"))?
            .rows_affected();
        if affected != targets.len() as u64 {
            Self::rollback(tx).await?;
            return Err(RepositoryError::OperationFailed(format!(
                "強制販売の更新件数が一致しません: expected={}, actual={}",
                targets.len(),
                affected
            )));
        }

        // 上書きした番号ごとに監査記録を残す
        let mut builder = QueryBuilder::<MySql>::new(
            "INSERT INTO raffle_number_overrides \
             (id, raffle_id, number, previous_status, previous_holder_id, ticket_id, actor, reason, source_event_id, created_at) ",
        );
        let actor_str = actor.to_string();
        builder.push_values(&result.overridden, |mut b, overridden| {
            b.push_bind(Uuid::new_v4().to_string())
                .push_bind(raffle_id.to_string())
                .push_bind(overridden.number)
                .push_bind(overridden.previous_status.as_str())
                .push_bind(overridden.previous_holder.map(|h| h.to_string()))
                .push_bind(ticket.to_string())
                .push_bind(actor_str.clone())
                .push_bind(audit.reason.as_str())
                .push_bind(audit.source_event_id.clone())
                .push_bind(now);
        });
        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(query_error("強制販売の監査記録に失敗しました"))?;

        Self::commit(tx).await?;
        Ok(result)
    }

    async fn release_expired_holds(
        &self,
        raffle_id: Option<RaffleId>,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        // 行ごとの条件付き更新のため、回収と予約が競合しても期限内の予約は変更されない
        let mut builder = QueryBuilder::<MySql>::new(
            "UPDATE raffle_numbers SET status = 'AVAILABLE', holder_id = NULL, hold_expires_at = NULL, updated_by = ",
        );
        builder
            .push_bind(Actor::System(SystemPrincipal::ExpiryReclaimer).to_string())
            .push(", updated_at = ")
            .push_bind(now)
            .push(format!(" WHERE {} AND status = 'HELD' AND hold_expires_at < ", VISIBLE))
            .push_bind(now);
        if let Some(raffle_id) = raffle_id {
            builder.push(" AND raffle_id = ").push_bind(raffle_id.to_string());
        }

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_error("期限切れ予約の回収に失敗しました"))?;
        Ok(result.rows_affected())
    }
}
