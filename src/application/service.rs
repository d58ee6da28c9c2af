mod payment_confirmation_service;
mod raffle_number_query_service;

pub use payment_confirmation_service::{
    PaymentConfirmation, PaymentConfirmationService, PaymentSettlement, PaymentStatus,
};
pub use raffle_number_query_service::{NumberBoard, RaffleNumberQueryService};

use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::event::{
    ExpiredHoldsReleased, InventoryEvent, NumbersForceSold, NumbersHeld, NumbersSold,
};
use crate::domain::model::{
    Actor, ForceSaleAudit, ForceSaleResult, HoldTtl, NumberSelection, RaffleId, RaffleInfo,
    RaffleNumber, SystemPrincipal, TicketId, UserId,
};
use crate::domain::port::{
    BatchOutcome, Clock, EventPublisher, Logger, RaffleLookup, RaffleNumberRepository,
};
use std::collections::HashMap;
use std::sync::Arc;

const COMPONENT: &str = "RaffleNumberService";

/// 予約・販売の運用パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// 保持期間の指定がない場合の既定値
    pub default_ttl: HoldTtl,
    /// 保持期間の上限（分）
    pub max_ttl_minutes: u32,
    /// 1リクエストで指定できる番号数の上限
    pub max_numbers_per_request: usize,
    /// 番号生成時に1トランザクションで作成する行数
    pub insert_chunk_size: u32,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            default_ttl: HoldTtl::default(),
            max_ttl_minutes: HoldTtl::DEFAULT_MAX_MINUTES,
            max_numbers_per_request: NumberSelection::DEFAULT_MAX_NUMBERS,
            insert_chunk_size: 1000,
        }
    }
}

impl ReservationPolicy {
    /// 番号の集合を検証する
    pub fn selection(&self, numbers: Vec<u32>) -> Result<NumberSelection, DomainError> {
        NumberSelection::new(numbers, self.max_numbers_per_request)
    }

    /// 保持期間を決定する（未指定なら既定値）
    pub fn hold_ttl(&self, ttl_minutes: Option<i64>) -> Result<HoldTtl, DomainError> {
        match ttl_minutes {
            Some(minutes) => HoldTtl::from_minutes(minutes, self.max_ttl_minutes),
            None => Ok(self.default_ttl),
        }
    }
}

/// 抽選番号アプリケーションサービス
/// 予約・販売確定・強制販売・期限切れ回収・番号生成を担当する
///
/// プロセス内のロックは持たず、排他はすべてリポジトリの条件付き書き込みに委ねる。
pub struct RaffleNumberApplicationService {
    number_repository: Arc<dyn RaffleNumberRepository>,
    raffle_lookup: Arc<dyn RaffleLookup>,
    event_publisher: Arc<dyn EventPublisher>,
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
    policy: ReservationPolicy,
}

impl RaffleNumberApplicationService {
    /// 新しいアプリケーションサービスを作成
    pub fn new(
        number_repository: Arc<dyn RaffleNumberRepository>,
        raffle_lookup: Arc<dyn RaffleLookup>,
        event_publisher: Arc<dyn EventPublisher>,
        logger: Arc<dyn Logger>,
        clock: Arc<dyn Clock>,
        policy: ReservationPolicy,
    ) -> Self {
        Self {
            number_repository,
            raffle_lookup,
            event_publisher,
            logger,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    /// 抽選を取得する（存在しなければNotFound）
    pub async fn load_raffle(&self, raffle_id: RaffleId) -> Result<RaffleInfo, ApplicationError> {
        self.raffle_lookup
            .find_raffle(raffle_id)
            .await?
            .ok_or_else(|| ApplicationError::raffle_not_found(raffle_id))
    }

    /// イベントを発行する
    /// 在庫の変更は確定済みのため、発行失敗はログに残すだけにする
    fn publish(&self, event: InventoryEvent) {
        if let Err(e) = self.event_publisher.publish(&event) {
            let mut context = HashMap::new();
            context.insert("event_type".to_string(), event.event_type().to_string());
            context.insert("error".to_string(), e.to_string());
            self.logger.error(COMPONENT, "イベントの発行に失敗しました", None, Some(context));
        }
    }

    /// 抽選の番号 `1..=total_numbers` を利用可能な状態で作成する
    /// 設定された件数ごとに分割して作成し、再実行しても重複は作成しない
    ///
    /// # Returns
    /// * `Ok(u64)` - 新たに作成した番号の数
    /// * `Err(ApplicationError)` - 抽選が存在しない、または作成失敗
    pub async fn initialize_numbers(&self, raffle_id: RaffleId) -> Result<u64, ApplicationError> {
        let raffle = self.load_raffle(raffle_id).await?;
        let chunk_size = self.policy.insert_chunk_size.max(1);
        let actor = Actor::System(SystemPrincipal::RaffleSetup);
        let now = self.clock.now();

        let mut inserted = 0;
        let mut start = 1u32;
        while start <= raffle.total_numbers {
            let end = start
                .saturating_add(chunk_size - 1)
                .min(raffle.total_numbers);
            inserted += self
                .number_repository
                .insert_available_numbers(raffle_id, start..=end, actor, now)
                .await?;
            match end.checked_add(1) {
                Some(next) => start = next,
                None => break,
            }
        }

        let mut context = HashMap::new();
        context.insert("raffle_id".to_string(), raffle_id.to_string());
        context.insert("total_numbers".to_string(), raffle.total_numbers.to_string());
        context.insert("inserted".to_string(), inserted.to_string());
        self.logger.info(COMPONENT, "抽選番号を生成しました", None, Some(context));

        Ok(inserted)
    }

    /// 番号を一括で予約する
    /// 1件でも利用可能でなければ何も変更せず、利用できない番号を返す
    ///
    /// # Arguments
    /// * `raffle_id` - 抽選ID
    /// * `numbers` - 予約する番号
    /// * `holder` - 予約者
    /// * `ttl_minutes` - 保持期間（分）。Noneなら既定値
    ///
    /// # Returns
    /// * `Ok(Vec<RaffleNumber>)` - 予約中になった番号（昇順）
    /// * `Err(ApplicationError::Conflict)` - 利用できない番号があった
    /// * `Err(ApplicationError::NotFound)` - 抽選または番号が存在しない
    /// * `Err(ApplicationError::InvalidArgument)` - 番号・保持期間の指定が不正
    pub async fn reserve(
        &self,
        raffle_id: RaffleId,
        numbers: Vec<u32>,
        holder: UserId,
        ttl_minutes: Option<i64>,
    ) -> Result<Vec<RaffleNumber>, ApplicationError> {
        let selection = self.policy.selection(numbers)?;
        let ttl = self.policy.hold_ttl(ttl_minutes)?;

        let raffle = self.load_raffle(raffle_id).await?;
        if !raffle.accepts_holds() {
            return Err(ApplicationError::NotFound {
                message: format!("抽選は予約を受け付けていません: {}", raffle_id),
                numbers: Vec::new(),
            });
        }
        let out_of_range = selection.out_of_range(raffle.total_numbers);
        if !out_of_range.is_empty() {
            return Err(DomainError::NumbersOutOfRange(out_of_range).into());
        }

        let now = self.clock.now();
        let expires_at = now + ttl.as_duration();
        let outcome = self
            .number_repository
            .hold_numbers(raffle_id, &selection, holder, expires_at, now)
            .await?;

        let mut context = HashMap::new();
        context.insert("raffle_id".to_string(), raffle_id.to_string());
        context.insert("holder".to_string(), holder.to_string());
        context.insert("numbers".to_string(), format!("{:?}", selection.numbers()));

        match outcome {
            BatchOutcome::Applied(rows) => {
                context.insert("expires_at".to_string(), expires_at.to_rfc3339());
                self.logger.info(COMPONENT, "番号を予約しました", None, Some(context));
                self.publish(InventoryEvent::NumbersHeld(NumbersHeld::new(
                    raffle_id,
                    holder,
                    selection.numbers().to_vec(),
                    expires_at,
                    now,
                )));
                Ok(rows)
            }
            BatchOutcome::Missing(missing) => {
                Err(DomainError::NumbersOutOfRange(missing).into())
            }
            BatchOutcome::Rejected(unavailable) => {
                context.insert("unavailable".to_string(), format!("{:?}", unavailable));
                self.logger
                    .info(COMPONENT, "利用できない番号があるため予約を拒否しました", None, Some(context));
                Err(DomainError::NumbersUnavailable(unavailable).into())
            }
        }
    }

    /// 予約者本人の予約を販売済みにする
    ///
    /// # Returns
    /// * `Ok(Vec<RaffleNumber>)` - 販売済みになった番号（昇順）
    /// * `Err(ApplicationError::Conflict)` - この予約者の予約ではない番号があった
    /// * `Err(ApplicationError::NotFound)` - 抽選または番号が存在しない
    pub async fn mark_sold(
        &self,
        raffle_id: RaffleId,
        numbers: Vec<u32>,
        ticket: TicketId,
        holder: UserId,
    ) -> Result<Vec<RaffleNumber>, ApplicationError> {
        let selection = self.policy.selection(numbers)?;
        self.load_raffle(raffle_id).await?;

        let now = self.clock.now();
        let outcome = self
            .number_repository
            .sell_held_numbers(raffle_id, &selection, holder, ticket, now)
            .await?;

        match outcome {
            BatchOutcome::Applied(rows) => {
                let mut context = HashMap::new();
                context.insert("raffle_id".to_string(), raffle_id.to_string());
                context.insert("holder".to_string(), holder.to_string());
                context.insert("ticket".to_string(), ticket.to_string());
                context.insert("numbers".to_string(), format!("{:?}", selection.numbers()));
                self.logger.info(COMPONENT, "番号を販売済みにしました", None, Some(context));
                self.publish(InventoryEvent::NumbersSold(NumbersSold::new(
                    raffle_id,
                    holder,
                    ticket,
                    selection.numbers().to_vec(),
                    now,
                )));
                Ok(rows)
            }
            BatchOutcome::Missing(missing) => Err(DomainError::NumbersOutOfRange(missing).into()),
            BatchOutcome::Rejected(not_held) => Err(DomainError::NumbersNotHeldBy(not_held).into()),
        }
    }

    /// 保持者を確認せずに番号を販売済みにする
    /// 他者の予約も上書きするため、理由コードと契機イベントIDを必ず記録する
    ///
    /// # Returns
    /// * `Ok(ForceSaleResult)` - 販売済みにした番号と、変更しなかった番号
    /// * `Err(ApplicationError::NotFound)` - 抽選が存在しない
    /// * `Err(ApplicationError::InvalidArgument)` - 強制販売を実行できない主体
    pub async fn force_mark_sold(
        &self,
        raffle_id: RaffleId,
        numbers: Vec<u32>,
        ticket: TicketId,
        actor: Actor,
        audit: ForceSaleAudit,
    ) -> Result<ForceSaleResult, ApplicationError> {
        actor.ensure_may_force_sell()?;
        let selection = self.policy.selection(numbers)?;
        self.load_raffle(raffle_id).await?;

        let now = self.clock.now();
        let result = self
            .number_repository
            .force_sell_numbers(raffle_id, &selection, ticket, actor, &audit, now)
            .await?;

        let clobbered = result.clobbered_holds();
        let mut context = HashMap::new();
        context.insert("raffle_id".to_string(), raffle_id.to_string());
        context.insert("ticket".to_string(), ticket.to_string());
        context.insert("actor".to_string(), actor.to_string());
        context.insert("reason".to_string(), audit.reason.to_string());
        context.insert("source_event_id".to_string(), audit.source_event_id.clone());
        context.insert(
            "sold".to_string(),
            format!("{:?}", result.sold.iter().map(RaffleNumber::number).collect::<Vec<_>>()),
        );
        context.insert("already_sold".to_string(), format!("{:?}", result.already_sold));
        context.insert("missing".to_string(), format!("{:?}", result.missing));
        context.insert(
            "clobbered_holds".to_string(),
            clobbered
                .iter()
                .map(|o| match o.previous_holder {
                    Some(holder) => format!("{}:{}", o.number, holder),
                    None => o.number.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        );
        self.logger.warn(
            COMPONENT,
            "保持者の確認なしに番号を販売済みにしました",
            None,
            Some(context),
        );

        self.publish(InventoryEvent::NumbersForceSold(NumbersForceSold {
            raffle_id,
            ticket,
            actor,
            audit,
            overridden: result.overridden.clone(),
            already_sold: result.already_sold.clone(),
            occurred_at: now,
        }));

        Ok(result)
    }

    /// 期限切れの予約を回収する
    ///
    /// # Arguments
    /// * `raffle_id` - 対象の抽選（Noneの場合はすべての抽選）
    ///
    /// # Returns
    /// * `Ok(u64)` - 回収した番号の数
    /// * `Err(ApplicationError::RepositoryError)` - 永続化の失敗
    pub async fn release_expired(&self, raffle_id: Option<RaffleId>) -> Result<u64, ApplicationError> {
        let now = self.clock.now();
        let released = self
            .number_repository
            .release_expired_holds(raffle_id, now)
            .await?;

        if released > 0 {
            let mut context = HashMap::new();
            context.insert(
                "raffle_id".to_string(),
                raffle_id.map_or_else(|| "*".to_string(), |id| id.to_string()),
            );
            context.insert("released".to_string(), released.to_string());
            self.logger
                .info(COMPONENT, "期限切れの予約を回収しました", None, Some(context));
            self.publish(InventoryEvent::ExpiredHoldsReleased(ExpiredHoldsReleased::new(
                raffle_id, released, now,
            )));
        }

        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{
        InMemoryRaffleLookup, InMemoryRaffleNumberRepository, ManualClock, TracingLogger,
    };
    use crate::domain::model::{ForceSaleReason, NumberStatus};
    use crate::domain::port::PublisherError;
    use chrono::Duration;
    use std::sync::Mutex;

    // 発行されたイベント種別を記録するテスト用の発行者
    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<&'static str>>,
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: &InventoryEvent) -> Result<(), PublisherError> {
            self.events.lock().unwrap().push(event.event_type());
            Ok(())
        }
    }

    struct FailingPublisher;

    impl EventPublisher for FailingPublisher {
        fn publish(&self, _event: &InventoryEvent) -> Result<(), PublisherError> {
            Err(PublisherError::PublishingFailed("unavailable".to_string()))
        }
    }

    struct Fixture {
        service: RaffleNumberApplicationService,
        repository: Arc<InMemoryRaffleNumberRepository>,
        lookup: Arc<InMemoryRaffleLookup>,
        clock: Arc<ManualClock>,
        publisher: Arc<RecordingPublisher>,
        raffle_id: RaffleId,
    }

    async fn fixture(total_numbers: u32) -> Fixture {
        let repository = Arc::new(InMemoryRaffleNumberRepository::new());
        let lookup = Arc::new(InMemoryRaffleLookup::new());
        let clock = Arc::new(ManualClock::starting_now());
        let publisher = Arc::new(RecordingPublisher::default());
        let raffle_id = RaffleId::new();
        lookup.insert(RaffleInfo::new(raffle_id, total_numbers)).await;

        let service = RaffleNumberApplicationService::new(
            repository.clone(),
            lookup.clone(),
            publisher.clone(),
            Arc::new(TracingLogger::new()),
            clock.clone(),
            ReservationPolicy {
                insert_chunk_size: 2,
                ..ReservationPolicy::default()
            },
        );
        service.initialize_numbers(raffle_id).await.unwrap();

        Fixture {
            service,
            repository,
            lookup,
            clock,
            publisher,
            raffle_id,
        }
    }

    async fn status_of(f: &Fixture, number: u32) -> NumberStatus {
        f.repository
            .find_by_numbers(f.raffle_id, &[number])
            .await
            .unwrap()[0]
            .status()
    }

    #[tokio::test]
    async fn test_initialize_numbers_is_chunked_and_idempotent() {
        let f = fixture(5).await;
        let all = f.repository.find_all(f.raffle_id).await.unwrap();
        assert_eq!(all.iter().map(RaffleNumber::number).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert!(all.iter().all(RaffleNumber::is_available));

        let inserted_again = f.service.initialize_numbers(f.raffle_id).await.unwrap();
        assert_eq!(inserted_again, 0);
    }

    #[tokio::test]
    async fn test_initialize_numbers_unknown_raffle() {
        let f = fixture(5).await;
        let result = f.service.initialize_numbers(RaffleId::new()).await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_reserve_success_uses_default_ttl() {
        let f = fixture(5).await;
        let holder = UserId::new();
        let rows = f.service.reserve(f.raffle_id, vec![3, 2], holder, None).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number(), 2);
        assert_eq!(rows[1].number(), 3);
        for row in &rows {
            assert!(row.is_held_by(holder));
            assert_eq!(row.hold_expires_at(), Some(f.clock.now() + Duration::minutes(15)));
        }
        assert_eq!(*f.publisher.events.lock().unwrap(), vec!["NumbersHeld"]);
    }

    #[tokio::test]
    async fn test_reserve_conflict_is_all_or_nothing() {
        let f = fixture(5).await;
        f.service.reserve(f.raffle_id, vec![3], UserId::new(), None).await.unwrap();

        let result = f.service.reserve(f.raffle_id, vec![2, 3, 4], UserId::new(), None).await;
        match result {
            Err(ApplicationError::Conflict { numbers, .. }) => assert_eq!(numbers, vec![3]),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(status_of(&f, 2).await, NumberStatus::Available);
        assert_eq!(status_of(&f, 4).await, NumberStatus::Available);
    }

    #[tokio::test]
    async fn test_reserve_out_of_range_is_not_found() {
        let f = fixture(5).await;
        let result = f.service.reserve(f.raffle_id, vec![1, 6], UserId::new(), None).await;
        match result {
            Err(ApplicationError::NotFound { numbers, .. }) => assert_eq!(numbers, vec![6]),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(status_of(&f, 1).await, NumberStatus::Available);
    }

    #[tokio::test]
    async fn test_reserve_rejects_invalid_arguments() {
        let f = fixture(5).await;
        let holder = UserId::new();
        assert!(matches!(
            f.service.reserve(f.raffle_id, vec![], holder, None).await,
            Err(ApplicationError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.reserve(f.raffle_id, vec![1, 1], holder, None).await,
            Err(ApplicationError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.reserve(f.raffle_id, vec![1], holder, Some(0)).await,
            Err(ApplicationError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_reserve_disabled_raffle_is_not_found() {
        let f = fixture(5).await;
        let mut raffle = RaffleInfo::new(f.raffle_id, 5);
        raffle.enabled = false;
        f.lookup.insert(raffle).await;

        let result = f.service.reserve(f.raffle_id, vec![1], UserId::new(), None).await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_sold_requires_same_holder() {
        let f = fixture(5).await;
        let holder = UserId::new();
        f.service.reserve(f.raffle_id, vec![1, 2], holder, None).await.unwrap();

        let result = f
            .service
            .mark_sold(f.raffle_id, vec![1, 2], TicketId::new(), UserId::new())
            .await;
        match result {
            Err(ApplicationError::Conflict { numbers, .. }) => assert_eq!(numbers, vec![1, 2]),
            other => panic!("unexpected result: {:?}", other),
        }

        let ticket = TicketId::new();
        let sold = f.service.mark_sold(f.raffle_id, vec![1, 2], ticket, holder).await.unwrap();
        assert!(sold.iter().all(|n| n.ticket() == Some(ticket) && n.holder().is_none()));
    }

    #[tokio::test]
    async fn test_mark_sold_partially_held_changes_nothing() {
        let f = fixture(5).await;
        let holder = UserId::new();
        f.service.reserve(f.raffle_id, vec![1], holder, None).await.unwrap();

        let result = f
            .service
            .mark_sold(f.raffle_id, vec![1, 2], TicketId::new(), holder)
            .await;
        match result {
            Err(ApplicationError::Conflict { numbers, .. }) => assert_eq!(numbers, vec![2]),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(status_of(&f, 1).await, NumberStatus::Held);
    }

    #[tokio::test]
    async fn test_force_mark_sold_overrides_and_skips_sold() {
        let f = fixture(5).await;
        let other_holder = UserId::new();
        f.service.reserve(f.raffle_id, vec![2], other_holder, None).await.unwrap();

        let first_ticket = TicketId::new();
        let holder = UserId::new();
        f.service.reserve(f.raffle_id, vec![3], holder, None).await.unwrap();
        f.service.mark_sold(f.raffle_id, vec![3], first_ticket, holder).await.unwrap();

        let audit = ForceSaleAudit::new(ForceSaleReason::UnverifiedPayer, "tx-42").unwrap();
        let result = f
            .service
            .force_mark_sold(
                f.raffle_id,
                vec![1, 2, 3],
                TicketId::new(),
                Actor::System(SystemPrincipal::PaymentReconciliation),
                audit,
            )
            .await
            .unwrap();

        assert_eq!(result.sold.iter().map(RaffleNumber::number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(result.already_sold, vec![3]);
        assert_eq!(result.clobbered_holds()[0].previous_holder, Some(other_holder));

        let third = f.repository.find_by_numbers(f.raffle_id, &[3]).await.unwrap();
        assert_eq!(third[0].ticket(), Some(first_ticket));

        let overrides = f.repository.override_log().await;
        assert_eq!(overrides.len(), 2);
        assert!(overrides.iter().all(|o| o.audit.source_event_id == "tx-42"));
    }

    #[tokio::test]
    async fn test_force_mark_sold_rejects_other_system_principals() {
        let f = fixture(5).await;
        let holder = UserId::new();
        f.service.reserve(f.raffle_id, vec![1], holder, None).await.unwrap();

        let audit = ForceSaleAudit::new(ForceSaleReason::AdministrativeCorrection, "ops-1").unwrap();
        let result = f
            .service
            .force_mark_sold(
                f.raffle_id,
                vec![1],
                TicketId::new(),
                Actor::System(SystemPrincipal::ExpiryReclaimer),
                audit,
            )
            .await;

        assert!(matches!(result, Err(ApplicationError::InvalidArgument(_))));
        assert_eq!(status_of(&f, 1).await, NumberStatus::Held);
        assert!(f.repository.override_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_release_expired_is_idempotent() {
        let f = fixture(5).await;
        f.service.reserve(f.raffle_id, vec![1], UserId::new(), Some(10)).await.unwrap();
        f.service.reserve(f.raffle_id, vec![2], UserId::new(), Some(30)).await.unwrap();

        f.clock.advance(Duration::minutes(11));
        assert_eq!(f.service.release_expired(Some(f.raffle_id)).await.unwrap(), 1);
        assert_eq!(f.service.release_expired(Some(f.raffle_id)).await.unwrap(), 0);

        assert_eq!(status_of(&f, 1).await, NumberStatus::Available);
        assert_eq!(status_of(&f, 2).await, NumberStatus::Held);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_operation() {
        let repository = Arc::new(InMemoryRaffleNumberRepository::new());
        let lookup = Arc::new(InMemoryRaffleLookup::new());
        let raffle_id = RaffleId::new();
        lookup.insert(RaffleInfo::new(raffle_id, 3)).await;
        let service = RaffleNumberApplicationService::new(
            repository,
            lookup,
            Arc::new(FailingPublisher),
            Arc::new(TracingLogger::new()),
            Arc::new(ManualClock::starting_now()),
            ReservationPolicy::default(),
        );
        service.initialize_numbers(raffle_id).await.unwrap();

        let rows = service.reserve(raffle_id, vec![1], UserId::new(), None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
