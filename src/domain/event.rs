use chrono::{DateTime, Utc};
use crate::domain::model::{
    Actor, ForceSaleAudit, OverriddenNumber, RaffleId, TicketId, UserId,
};

/// ドメインイベント列挙型
/// 番号在庫で起きた重要な出来事を表現する
#[derive(Debug, Clone)]
pub enum InventoryEvent {
    /// 番号が予約された
    NumbersHeld(NumbersHeld),
    /// 予約が販売済みになった
    NumbersSold(NumbersSold),
    /// 保持者の確認なしに販売済みにされた
    NumbersForceSold(NumbersForceSold),
    /// 期限切れの予約が回収された
    ExpiredHoldsReleased(ExpiredHoldsReleased),
}

impl InventoryEvent {
    /// イベント種別名
    pub fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::NumbersHeld(_) => "NumbersHeld",
            InventoryEvent::NumbersSold(_) => "NumbersSold",
            InventoryEvent::NumbersForceSold(_) => "NumbersForceSold",
            InventoryEvent::ExpiredHoldsReleased(_) => "ExpiredHoldsReleased",
        }
    }
}

/// 予約イベント
#[derive(Debug, Clone)]
pub struct NumbersHeld {
    pub raffle_id: RaffleId,
    pub holder: UserId,
    pub numbers: Vec<u32>,
    pub expires_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

impl NumbersHeld {
    pub fn new(
        raffle_id: RaffleId,
        holder: UserId,
        numbers: Vec<u32>,
        expires_at: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            raffle_id,
            holder,
            numbers,
            expires_at,
            occurred_at,
        }
    }
}

/// 販売イベント
#[derive(Debug, Clone)]
pub struct NumbersSold {
    pub raffle_id: RaffleId,
    pub holder: UserId,
    pub ticket: TicketId,
    pub numbers: Vec<u32>,
    pub occurred_at: DateTime<Utc>,
}

impl NumbersSold {
    pub fn new(
        raffle_id: RaffleId,
        holder: UserId,
        ticket: TicketId,
        numbers: Vec<u32>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            raffle_id,
            holder,
            ticket,
            numbers,
            occurred_at,
        }
    }
}

/// 強制販売イベント
/// 他者の予約を上書きし得るため、通常の販売とは別に監査する
#[derive(Debug, Clone)]
pub struct NumbersForceSold {
    pub raffle_id: RaffleId,
    pub ticket: TicketId,
    pub actor: Actor,
    pub audit: ForceSaleAudit,
    /// 販売済みになった番号と、その直前の状態
    pub overridden: Vec<OverriddenNumber>,
    /// すでに販売済みで変更しなかった番号
    pub already_sold: Vec<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// 期限切れ予約の回収イベント
#[derive(Debug, Clone)]
pub struct ExpiredHoldsReleased {
    /// 対象の抽選（Noneの場合はすべての抽選）
    pub raffle_id: Option<RaffleId>,
    pub released_count: u64,
    pub occurred_at: DateTime<Utc>,
}

impl ExpiredHoldsReleased {
    pub fn new(raffle_id: Option<RaffleId>, released_count: u64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            raffle_id,
            released_count,
            occurred_at,
        }
    }
}
