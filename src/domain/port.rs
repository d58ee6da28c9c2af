// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::event::InventoryEvent;
use crate::domain::model::{
    Actor, ForceSaleAudit, ForceSaleResult, NumberSelection, NumberStatus, RaffleId, RaffleInfo,
    RaffleNumber, TicketId, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// 時刻の取得を抽象化するポート
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    ConnectionFailed(String),
    /// 操作に失敗
    OperationFailed(String),
    /// データの取得に失敗
    FetchFailed(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RepositoryError::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            RepositoryError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// 条件付き一括更新の結果
/// 全件が条件を満たした場合のみ適用され、それ以外は何も変更されない
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 全件に適用された（番号の昇順）
    Applied(Vec<RaffleNumber>),
    /// 行が存在しない番号があった
    Missing(Vec<u32>),
    /// 条件を満たさない番号があった
    Rejected(Vec<u32>),
}

/// 抽選番号リポジトリトレイト
/// 番号在庫の永続化と、状態遷移の条件付き書き込みを抽象化する
///
/// 論理削除・無効化された行はすべての操作で存在しないものとして扱う。
#[async_trait]
pub trait RaffleNumberRepository: Send + Sync {
    /// 利用可能な番号をまとめて作成する
    /// すでに存在する `(raffle_id, number)` は変更しない
    ///
    /// # Returns
    /// * `Ok(u64)` - 新たに作成した行数
    /// * `Err(RepositoryError)` - 作成失敗
    async fn insert_available_numbers(
        &self,
        raffle_id: RaffleId,
        numbers: RangeInclusive<u32>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// 指定された番号の行を取得する（番号の昇順）
    async fn find_by_numbers(
        &self,
        raffle_id: RaffleId,
        numbers: &[u32],
    ) -> Result<Vec<RaffleNumber>, RepositoryError>;

    /// 抽選のすべての行を取得する（番号の昇順）
    async fn find_all(&self, raffle_id: RaffleId) -> Result<Vec<RaffleNumber>, RepositoryError>;

    /// 指定されたステータスの行を取得する（番号の昇順）
    async fn find_by_status(
        &self,
        raffle_id: RaffleId,
        status: NumberStatus,
    ) -> Result<Vec<RaffleNumber>, RepositoryError>;

    /// 指定された保持者が予約中の行を取得する（番号の昇順）
    async fn find_held_by(
        &self,
        raffle_id: RaffleId,
        holder: UserId,
    ) -> Result<Vec<RaffleNumber>, RepositoryError>;

    /// 利用可能な番号を一括で予約する
    /// 1件でも利用可能でなければ全体を取り消す
    ///
    /// # Returns
    /// * `Ok(BatchOutcome::Applied)` - 全件を予約した
    /// * `Ok(BatchOutcome::Missing)` - 存在しない番号があった
    /// * `Ok(BatchOutcome::Rejected)` - 利用可能でない番号があった
    /// * `Err(RepositoryError)` - 永続化の失敗
    async fn hold_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        holder: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, RepositoryError>;

    /// 指定された保持者の予約を一括で販売済みにする
    /// 1件でもその保持者の予約でなければ全体を取り消す
    async fn sell_held_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        holder: UserId,
        ticket: TicketId,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, RepositoryError>;

    /// 保持者を確認せずに番号を販売済みにする
    /// 販売済みの番号は変更せず、上書きごとに監査記録を残す
    async fn force_sell_numbers(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        ticket: TicketId,
        actor: Actor,
        audit: &ForceSaleAudit,
        now: DateTime<Utc>,
    ) -> Result<ForceSaleResult, RepositoryError>;

    /// 期限切れの予約を利用可能に戻す
    ///
    /// # Arguments
    /// * `raffle_id` - 対象の抽選（Noneの場合はすべての抽選）
    /// * `now` - 現在日時（これより前に期限が切れた予約が対象）
    ///
    /// # Returns
    /// * `Ok(u64)` - 回収した行数
    async fn release_expired_holds(
        &self,
        raffle_id: Option<RaffleId>,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}

/// 抽選参照トレイト
/// 抽選管理（外部の協調者）への問い合わせを抽象化する
#[async_trait]
pub trait RaffleLookup: Send + Sync {
    /// 抽選を取得する
    ///
    /// # Returns
    /// * `Ok(Some(RaffleInfo))` - 抽選が見つかった
    /// * `Ok(None)` - 抽選が見つからなかった
    async fn find_raffle(&self, raffle_id: RaffleId) -> Result<Option<RaffleInfo>, RepositoryError>;
}

/// チケット発行エラー
#[derive(Debug, thiserror::Error)]
pub enum TicketMintingError {
    #[error("Ticket minting failed: {0}")]
    MintingFailed(String),
}

/// チケット発行トレイト
/// 抽選と購入者からチケットIDを発行する協調者
#[async_trait]
pub trait TicketMinter: Send + Sync {
    async fn mint_ticket(
        &self,
        raffle_id: RaffleId,
        buyer: Option<UserId>,
    ) -> Result<TicketId, TicketMintingError>;
}

/// 決済取引台帳トレイト
/// 決済取引IDと、その取引のために発行したチケットの対応を保持する
#[async_trait]
pub trait PaymentSettlementRepository: Send + Sync {
    /// 取引に割り当て済みのチケットを取得する
    async fn find_ticket(&self, transaction_id: &str) -> Result<Option<TicketId>, RepositoryError>;

    /// 取引にチケットを割り当てる
    ///
    /// # Returns
    /// * `Ok(TicketId)` - 取引に割り当てられたチケット
    ///   （すでに割り当て済みの場合は既存のチケット）
    async fn claim_ticket(
        &self,
        transaction_id: &str,
        raffle_id: RaffleId,
        ticket: TicketId,
    ) -> Result<TicketId, RepositoryError>;
}

/// イベント発行エラー
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("Event publishing failed: {0}")]
    PublishingFailed(String),
}

/// イベント発行トレイト
pub trait EventPublisher: Send + Sync {
    /// イベントを発行する
    fn publish(&self, event: &InventoryEvent) -> Result<(), PublisherError>;
}
