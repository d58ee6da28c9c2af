use crate::domain::error::DomainError;
use crate::domain::model::{
    Actor, NumberStatus, RaffleId, RaffleNumberId, SystemPrincipal, TicketId, UserId,
};
use chrono::{DateTime, Utc};

/// 抽選番号の状態
/// 状態ごとに必要なデータだけを保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberState {
    /// 利用可能
    Available,
    /// 予約中
    Held {
        holder: UserId,
        expires_at: DateTime<Utc>,
    },
    /// 販売済み
    Sold { ticket: TicketId },
}

impl NumberState {
    pub fn status(&self) -> NumberStatus {
        match self {
            NumberState::Available => NumberStatus::Available,
            NumberState::Held { .. } => NumberStatus::Held,
            NumberState::Sold { .. } => NumberStatus::Sold,
        }
    }
}

/// 監査項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditStamp {
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_by: Actor,
    pub updated_at: DateTime<Utc>,
}

impl AuditStamp {
    /// 作成時の監査項目
    pub fn created(actor: Actor, now: DateTime<Utc>) -> Self {
        Self {
            created_by: actor,
            created_at: now,
            updated_by: actor,
            updated_at: now,
        }
    }

    /// 更新者と更新日時を差し替えた監査項目
    pub fn touched(&self, actor: Actor, now: DateTime<Utc>) -> Self {
        Self {
            updated_by: actor,
            updated_at: now,
            ..*self
        }
    }
}

/// 抽選番号エンティティ
/// 抽選ごと・番号ごとに1行存在する
///
/// 状態遷移はすべて自身を変更せず、遷移後の行を返す。
/// 同時実行時の排他はストレージ層の条件付き更新が担う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleNumber {
    id: RaffleNumberId,
    raffle_id: RaffleId,
    number: u32,
    state: NumberState,
    enabled: bool,
    deleted: bool,
    audit: AuditStamp,
}

impl RaffleNumber {
    /// 利用可能な新しい番号を作成
    pub fn new_available(raffle_id: RaffleId, number: u32, actor: Actor, now: DateTime<Utc>) -> Self {
        Self {
            id: RaffleNumberId::new(),
            raffle_id,
            number,
            state: NumberState::Available,
            enabled: true,
            deleted: false,
            audit: AuditStamp::created(actor, now),
        }
    }

    /// データベースの列から番号を再構築
    /// ステータスと付随列の組み合わせが不整合ならエラー
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: RaffleNumberId,
        raffle_id: RaffleId,
        number: u32,
        status: NumberStatus,
        holder: Option<UserId>,
        hold_expires_at: Option<DateTime<Utc>>,
        ticket: Option<TicketId>,
        enabled: bool,
        deleted: bool,
        audit: AuditStamp,
    ) -> Result<Self, DomainError> {
        let state = match (status, holder, hold_expires_at, ticket) {
            (NumberStatus::Available, None, None, None) => NumberState::Available,
            (NumberStatus::Held, Some(holder), Some(expires_at), None) => {
                NumberState::Held { holder, expires_at }
            }
            (NumberStatus::Sold, None, None, Some(ticket)) => NumberState::Sold { ticket },
            _ => {
                return Err(DomainError::InvalidValue(format!(
                    "番号{}の状態が不整合です: status={}",
                    number, status
                )))
            }
        };

        Ok(Self {
            id,
            raffle_id,
            number,
            state,
            enabled,
            deleted,
            audit,
        })
    }

    pub fn id(&self) -> RaffleNumberId {
        self.id
    }

    pub fn raffle_id(&self) -> RaffleId {
        self.raffle_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn status(&self) -> NumberStatus {
        self.state.status()
    }

    /// 予約者（予約中の場合のみ）
    pub fn holder(&self) -> Option<UserId> {
        match self.state {
            NumberState::Held { holder, .. } => Some(holder),
            _ => None,
        }
    }

    /// 予約の有効期限（予約中の場合のみ）
    pub fn hold_expires_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            NumberState::Held { expires_at, .. } => Some(expires_at),
            _ => None,
        }
    }

    /// チケットID（販売済みの場合のみ）
    pub fn ticket(&self) -> Option<TicketId> {
        match self.state {
            NumberState::Sold { ticket } => Some(ticket),
            _ => None,
        }
    }

    pub fn audit(&self) -> AuditStamp {
        self.audit
    }

    /// 在庫操作の対象になるか（有効かつ論理削除されていない）
    pub fn is_visible(&self) -> bool {
        self.enabled && !self.deleted
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, NumberState::Available)
    }

    pub fn is_held_by(&self, holder: UserId) -> bool {
        matches!(self.state, NumberState::Held { holder: h, .. } if h == holder)
    }

    /// 予約の有効期限を過ぎているか
    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state, NumberState::Held { expires_at, .. } if expires_at < now)
    }

    /// 利用可能な番号を予約する
    ///
    /// # Arguments
    /// * `holder` - 予約者
    /// * `expires_at` - 予約の有効期限
    /// * `now` - 現在日時
    ///
    /// # Returns
    /// * `Ok(RaffleNumber)` - 予約中になった番号
    /// * `Err(DomainError::NumbersUnavailable)` - 利用可能ではない
    pub fn hold(
        &self,
        holder: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !self.is_visible() || !self.is_available() {
            return Err(DomainError::NumbersUnavailable(vec![self.number]));
        }
        Ok(Self {
            state: NumberState::Held { holder, expires_at },
            audit: self.audit.touched(Actor::User(holder), now),
            ..self.clone()
        })
    }

    /// 予約者本人の予約を販売済みにする
    ///
    /// # Returns
    /// * `Ok(RaffleNumber)` - 販売済みになった番号
    /// * `Err(DomainError::NumbersNotHeldBy)` - 指定の予約者が予約していない
    pub fn sell(&self, holder: UserId, ticket: TicketId, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.is_visible() || !self.is_held_by(holder) {
            return Err(DomainError::NumbersNotHeldBy(vec![self.number]));
        }
        Ok(Self {
            state: NumberState::Sold { ticket },
            audit: self.audit.touched(Actor::User(holder), now),
            ..self.clone()
        })
    }

    /// 保持者の確認を行わずに販売済みにする
    /// 販売済みの番号は終端状態のため変更できない
    pub fn force_sell(&self, ticket: TicketId, actor: Actor, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if let NumberState::Sold { .. } = self.state {
            return Err(DomainError::InvalidTransition {
                number: self.number,
                reason: "販売済みの番号は変更できません".to_string(),
            });
        }
        Ok(Self {
            state: NumberState::Sold { ticket },
            audit: self.audit.touched(actor, now),
            ..self.clone()
        })
    }

    /// 期限切れの予約を解放する
    /// 期限内の予約や予約中以外の番号は解放できない
    pub fn release_expired(&self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !self.is_hold_expired(now) {
            return Err(DomainError::InvalidTransition {
                number: self.number,
                reason: "期限切れの予約ではありません".to_string(),
            });
        }
        Ok(Self {
            state: NumberState::Available,
            audit: self
                .audit
                .touched(Actor::System(SystemPrincipal::ExpiryReclaimer), now),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn available(number: u32) -> RaffleNumber {
        RaffleNumber::new_available(
            RaffleId::new(),
            number,
            Actor::System(SystemPrincipal::RaffleSetup),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_number_is_available() {
        let n = available(7);
        assert_eq!(n.number(), 7);
        assert_eq!(n.status(), NumberStatus::Available);
        assert!(n.holder().is_none());
        assert!(n.hold_expires_at().is_none());
        assert!(n.ticket().is_none());
        assert!(n.is_visible());
    }

    #[test]
    fn test_hold_stamps_holder_and_expiry() {
        let now = Utc::now();
        let holder = UserId::new();
        let held = available(1).hold(holder, now + Duration::minutes(15), now).unwrap();

        assert_eq!(held.status(), NumberStatus::Held);
        assert_eq!(held.holder(), Some(holder));
        assert_eq!(held.hold_expires_at(), Some(now + Duration::minutes(15)));
        assert_eq!(held.audit().updated_by, Actor::User(holder));
    }

    #[test]
    fn test_hold_rejects_held_number() {
        let now = Utc::now();
        let held = available(3)
            .hold(UserId::new(), now + Duration::minutes(5), now)
            .unwrap();
        let result = held.hold(UserId::new(), now + Duration::minutes(5), now);
        assert_eq!(result, Err(DomainError::NumbersUnavailable(vec![3])));
    }

    #[test]
    fn test_sell_requires_same_holder() {
        let now = Utc::now();
        let holder = UserId::new();
        let held = available(2).hold(holder, now + Duration::minutes(5), now).unwrap();

        let result = held.sell(UserId::new(), TicketId::new(), now);
        assert_eq!(result, Err(DomainError::NumbersNotHeldBy(vec![2])));

        let ticket = TicketId::new();
        let sold = held.sell(holder, ticket, now).unwrap();
        assert_eq!(sold.status(), NumberStatus::Sold);
        assert_eq!(sold.ticket(), Some(ticket));
        assert!(sold.holder().is_none());
        assert!(sold.hold_expires_at().is_none());
    }

    #[test]
    fn test_sold_is_terminal() {
        let now = Utc::now();
        let holder = UserId::new();
        let sold = available(4)
            .hold(holder, now + Duration::minutes(5), now)
            .unwrap()
            .sell(holder, TicketId::new(), now)
            .unwrap();

        assert!(sold.hold(holder, now + Duration::minutes(5), now).is_err());
        assert!(sold.sell(holder, TicketId::new(), now).is_err());
        assert!(sold
            .force_sell(
                TicketId::new(),
                Actor::System(SystemPrincipal::PaymentReconciliation),
                now
            )
            .is_err());
        assert!(sold.release_expired(now + Duration::days(1)).is_err());
    }

    #[test]
    fn test_force_sell_overrides_hold() {
        let now = Utc::now();
        let held = available(5)
            .hold(UserId::new(), now + Duration::minutes(5), now)
            .unwrap();
        let actor = Actor::System(SystemPrincipal::PaymentReconciliation);
        let sold = held.force_sell(TicketId::new(), actor, now).unwrap();
        assert_eq!(sold.status(), NumberStatus::Sold);
        assert_eq!(sold.audit().updated_by, actor);
    }

    #[test]
    fn test_release_only_after_expiry() {
        let now = Utc::now();
        let held = available(6)
            .hold(UserId::new(), now + Duration::minutes(15), now)
            .unwrap();

        assert!(held.release_expired(now).is_err());

        let later = now + Duration::minutes(16);
        let released = held.release_expired(later).unwrap();
        assert_eq!(released.status(), NumberStatus::Available);
        assert!(released.holder().is_none());
        assert_eq!(
            released.audit().updated_by,
            Actor::System(SystemPrincipal::ExpiryReclaimer)
        );
    }

    #[test]
    fn test_reconstruct_rejects_inconsistent_columns() {
        let now = Utc::now();
        let audit = AuditStamp::created(Actor::System(SystemPrincipal::RaffleSetup), now);
        let result = RaffleNumber::reconstruct(
            RaffleNumberId::new(),
            RaffleId::new(),
            1,
            NumberStatus::Held,
            None,
            Some(now),
            None,
            true,
            false,
            audit,
        );
        assert!(result.is_err());

        let result = RaffleNumber::reconstruct(
            RaffleNumberId::new(),
            RaffleId::new(),
            1,
            NumberStatus::Sold,
            None,
            None,
            Some(TicketId::new()),
            true,
            false,
            audit,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_deleted_number_cannot_be_held() {
        let now = Utc::now();
        let audit = AuditStamp::created(Actor::System(SystemPrincipal::RaffleSetup), now);
        let deleted = RaffleNumber::reconstruct(
            RaffleNumberId::new(),
            RaffleId::new(),
            9,
            NumberStatus::Available,
            None,
            None,
            None,
            true,
            true,
            audit,
        )
        .unwrap();
        assert!(deleted.hold(UserId::new(), now, now).is_err());
    }
}
