use crate::domain::error::DomainError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::BTreeSet;
use std::fmt;

/// 抽選の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RaffleId(Uuid);

impl RaffleId {
    /// 新しい一意のRaffleIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから RaffleId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からRaffleIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for RaffleId {
    fn default() -> Self {
        Self::new()
    }
}

/// 抽選番号行の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaffleNumberId(Uuid);

impl RaffleNumberId {
    /// 新しい一意のRaffleNumberIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 文字列からRaffleNumberIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RaffleNumberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for RaffleNumberId {
    fn default() -> Self {
        Self::new()
    }
}

/// 利用者（番号の保持者・購入者）の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// 新しい一意のUserIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから UserId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からUserIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// チケットの一意識別子
/// 販売済み番号に刻印される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// 新しい一意のTicketIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから TicketId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からTicketIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

/// システム主体
/// 利用者以外が行う操作の実行者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemPrincipal {
    /// 期限切れ予約の回収
    ExpiryReclaimer,
    /// 決済確定通知による照合
    PaymentReconciliation,
    /// 抽選作成時の番号生成
    RaffleSetup,
}

impl SystemPrincipal {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemPrincipal::ExpiryReclaimer => "expiry-reclaimer",
            SystemPrincipal::PaymentReconciliation => "payment-reconciliation",
            SystemPrincipal::RaffleSetup => "raffle-setup",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "expiry-reclaimer" => Ok(SystemPrincipal::ExpiryReclaimer),
            "payment-reconciliation" => Ok(SystemPrincipal::PaymentReconciliation),
            "raffle-setup" => Ok(SystemPrincipal::RaffleSetup),
            _ => Err(DomainError::InvalidValue(format!(
                "不明なシステム主体: {}",
                s
            ))),
        }
    }
}

/// 操作の実行者
/// 監査項目（作成者・更新者）に記録される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// 利用者
    User(UserId),
    /// システム
    System(SystemPrincipal),
}

impl Actor {
    /// 永続化用の文字列表現から復元する
    /// 形式: `user:<uuid>` または `system:<principal>`
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s.split_once(':') {
            Some(("user", id)) => UserId::from_string(id)
                .map(Actor::User)
                .map_err(|e| DomainError::InvalidValue(format!("無効な利用者ID: {}", e))),
            Some(("system", principal)) => SystemPrincipal::from_string(principal).map(Actor::System),
            _ => Err(DomainError::InvalidValue(format!("無効な実行者: {}", s))),
        }
    }

    /// 利用者であればそのIDを返す
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::User(user_id) => Some(*user_id),
            Actor::System(_) => None,
        }
    }

    /// 強制販売を実行できる主体か確認する
    /// 利用者と決済照合のみが強制販売の監査記録に残せる
    pub fn ensure_may_force_sell(&self) -> Result<(), DomainError> {
        match self {
            Actor::User(_) | Actor::System(SystemPrincipal::PaymentReconciliation) => Ok(()),
            Actor::System(_) => Err(DomainError::InvalidValue(format!(
                "強制販売を実行できない主体です: {}",
                self
            ))),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(user_id) => write!(f, "user:{}", user_id),
            Actor::System(principal) => write!(f, "system:{}", principal.as_str()),
        }
    }
}

/// 抽選番号のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberStatus {
    /// 利用可能
    Available,
    /// 予約中
    Held,
    /// 販売済み（終端状態）
    Sold,
}

impl NumberStatus {
    /// 永続化用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberStatus::Available => "AVAILABLE",
            NumberStatus::Held => "HELD",
            NumberStatus::Sold => "SOLD",
        }
    }

    /// 文字列からステータスを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "AVAILABLE" => Ok(NumberStatus::Available),
            "HELD" => Ok(NumberStatus::Held),
            "SOLD" => Ok(NumberStatus::Sold),
            _ => Err(DomainError::InvalidValue(format!(
                "無効なステータス値: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for NumberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 操作対象の番号の集合
/// 空でなく、重複がなく、上限以下であることを保証する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberSelection {
    numbers: Vec<u32>,
}

impl NumberSelection {
    /// 1リクエストあたりの番号数の既定上限
    pub const DEFAULT_MAX_NUMBERS: usize = 100;

    /// 番号の集合を検証して作成する
    /// 番号は昇順に並べ替えて保持する
    pub fn new(numbers: Vec<u32>, max_numbers: usize) -> Result<Self, DomainError> {
        if numbers.is_empty() {
            return Err(DomainError::InvalidSelection(
                "番号が指定されていません".to_string(),
            ));
        }
        if numbers.len() > max_numbers {
            return Err(DomainError::InvalidSelection(format!(
                "一度に指定できる番号は{}個までです（指定数: {}）",
                max_numbers,
                numbers.len()
            )));
        }

        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for number in &numbers {
            if !seen.insert(*number) {
                duplicates.insert(*number);
            }
        }
        if !duplicates.is_empty() {
            return Err(DomainError::InvalidSelection(format!(
                "番号が重複しています: {:?}",
                duplicates.into_iter().collect::<Vec<_>>()
            )));
        }

        Ok(Self {
            numbers: seen.into_iter().collect(),
        })
    }

    /// 番号のリストを取得（昇順）
    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// 番号範囲 `1..=total_numbers` に収まらない番号を返す
    pub fn out_of_range(&self, total_numbers: u32) -> Vec<u32> {
        self.numbers
            .iter()
            .copied()
            .filter(|n| *n == 0 || *n > total_numbers)
            .collect()
    }

    /// この集合のうち `found` に含まれない番号を返す
    pub fn missing_from(&self, found: &[u32]) -> Vec<u32> {
        let found: BTreeSet<u32> = found.iter().copied().collect();
        self.numbers
            .iter()
            .copied()
            .filter(|n| !found.contains(n))
            .collect()
    }
}

/// 予約の保持期間（TTL）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTtl {
    minutes: u32,
}

impl HoldTtl {
    /// 既定の保持期間（分）
    pub const DEFAULT_MINUTES: u32 = 15;
    /// 既定の保持期間の上限（分）
    pub const DEFAULT_MAX_MINUTES: u32 = 24 * 60;

    /// 分単位で保持期間を作成する
    /// 1分以上、上限以下である必要がある
    pub fn from_minutes(minutes: i64, max_minutes: u32) -> Result<Self, DomainError> {
        if minutes <= 0 {
            return Err(DomainError::InvalidHoldTtl(format!(
                "保持期間は正の値である必要があります: {}",
                minutes
            )));
        }
        if minutes > i64::from(max_minutes) {
            return Err(DomainError::InvalidHoldTtl(format!(
                "保持期間は{}分以下である必要があります: {}",
                max_minutes, minutes
            )));
        }
        Ok(Self {
            minutes: minutes as u32,
        })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn as_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
    }
}

impl Default for HoldTtl {
    fn default() -> Self {
        Self {
            minutes: Self::DEFAULT_MINUTES,
        }
    }
}

/// ステータスごとの番号数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NumberCounts {
    pub available: u64,
    pub held: u64,
    pub sold: u64,
}

impl NumberCounts {
    /// ステータスを1件加算する
    pub fn record(&mut self, status: NumberStatus) {
        match status {
            NumberStatus::Available => self.available += 1,
            NumberStatus::Held => self.held += 1,
            NumberStatus::Sold => self.sold += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.available + self.held + self.sold
    }
}
