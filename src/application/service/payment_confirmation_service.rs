use crate::application::service::RaffleNumberApplicationService;
use crate::application::ApplicationError;
use crate::domain::model::{
    Actor, ForceSaleAudit, ForceSaleReason, ForceSaleResult, NumberSelection, RaffleId,
    RaffleNumber, SystemPrincipal, TicketId, UserId,
};
use crate::domain::port::{
    Logger, PaymentSettlementRepository, RaffleNumberRepository, TicketMinter,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const COMPONENT: &str = "PaymentConfirmationService";

/// 決済の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Approved,
    Declined,
    Pending,
}

/// 決済確定通知
/// 決済ゲートウェイ（外部）から届く内容のうち在庫照合に必要なもの
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub transaction_id: String,
    pub raffle_id: RaffleId,
    pub numbers: Vec<u32>,
    pub payer_id: Option<UserId>,
    pub status: PaymentStatus,
    /// 決済金額（最小通貨単位）
    pub amount: i64,
}

/// 決済確定通知の処理結果
#[derive(Debug, Clone)]
pub enum PaymentSettlement {
    /// 承認以外の通知のため在庫を変更しなかった
    Ignored { status: PaymentStatus },
    /// この取引のチケットですべての番号が販売済みだった（重複通知）
    AlreadySettled { numbers: Vec<u32> },
    /// 支払者の予約を販売済みにした
    Sold {
        ticket: TicketId,
        numbers: Vec<RaffleNumber>,
    },
    /// 予約を確認できないため強制販売した
    ForceSold {
        ticket: TicketId,
        reason: ForceSaleReason,
        result: ForceSaleResult,
    },
}

/// 決済確定サービス
/// 決済確定通知を受けてチケットを発行し、通常の販売確定または強制販売を行う
pub struct PaymentConfirmationService {
    number_service: Arc<RaffleNumberApplicationService>,
    number_repository: Arc<dyn RaffleNumberRepository>,
    settlement_repository: Arc<dyn PaymentSettlementRepository>,
    ticket_minter: Arc<dyn TicketMinter>,
    logger: Arc<dyn Logger>,
}

impl PaymentConfirmationService {
    pub fn new(
        number_service: Arc<RaffleNumberApplicationService>,
        number_repository: Arc<dyn RaffleNumberRepository>,
        settlement_repository: Arc<dyn PaymentSettlementRepository>,
        ticket_minter: Arc<dyn TicketMinter>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            number_service,
            number_repository,
            settlement_repository,
            ticket_minter,
            logger,
        }
    }

    /// 決済確定通知を処理する
    ///
    /// 支払者が分かる場合は通常の販売確定を試み、予約を確認できなければ
    /// 強制販売に切り替える。支払者が分からない場合は最初から強制販売とする。
    /// 取引ごとのチケットは台帳に記録し、同じ取引の再通知では発行し直さない。
    ///
    /// # Returns
    /// * `Ok(PaymentSettlement)` - 処理結果
    /// * `Err(ApplicationError)` - 抽選が存在しない、チケット発行や永続化の失敗など
    pub async fn handle(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<PaymentSettlement, ApplicationError> {
        let mut context = HashMap::new();
        context.insert("transaction_id".to_string(), confirmation.transaction_id.clone());
        context.insert("raffle_id".to_string(), confirmation.raffle_id.to_string());
        context.insert("status".to_string(), format!("{:?}", confirmation.status));
        context.insert("amount".to_string(), confirmation.amount.to_string());

        if confirmation.status != PaymentStatus::Approved {
            self.logger.info(
                COMPONENT,
                "承認されていない決済のため在庫を変更しません",
                None,
                Some(context),
            );
            return Ok(PaymentSettlement::Ignored {
                status: confirmation.status,
            });
        }
        ForceSaleAudit::validate_source_event_id(&confirmation.transaction_id)?;

        let selection = self
            .number_service
            .policy()
            .selection(confirmation.numbers.clone())?;
        self.number_service.load_raffle(confirmation.raffle_id).await?;

        let ticket = match self
            .settlement_repository
            .find_ticket(&confirmation.transaction_id)
            .await?
        {
            Some(ticket) => {
                if self.is_settled_with(confirmation.raffle_id, &selection, ticket).await? {
                    context.insert("ticket".to_string(), ticket.to_string());
                    self.logger.info(
                        COMPONENT,
                        "この取引で販売済みのため重複通知として扱います",
                        None,
                        Some(context),
                    );
                    return Ok(PaymentSettlement::AlreadySettled {
                        numbers: selection.numbers().to_vec(),
                    });
                }
                ticket
            }
            None => {
                let minted = self
                    .ticket_minter
                    .mint_ticket(confirmation.raffle_id, confirmation.payer_id)
                    .await?;
                self.settlement_repository
                    .claim_ticket(&confirmation.transaction_id, confirmation.raffle_id, minted)
                    .await?
            }
        };
        context.insert("ticket".to_string(), ticket.to_string());

        let reason = match confirmation.payer_id {
            Some(payer) => {
                match self
                    .number_service
                    .mark_sold(confirmation.raffle_id, selection.numbers().to_vec(), ticket, payer)
                    .await
                {
                    Ok(numbers) => {
                        self.logger.info(COMPONENT, "決済を販売確定に反映しました", None, Some(context));
                        return Ok(PaymentSettlement::Sold { ticket, numbers });
                    }
                    Err(ApplicationError::Conflict { numbers, .. }) => {
                        // 同じ取引の並行した通知が先に販売確定した
                        if self.is_settled_with(confirmation.raffle_id, &selection, ticket).await? {
                            return Ok(PaymentSettlement::AlreadySettled {
                                numbers: selection.numbers().to_vec(),
                            });
                        }
                        context.insert("not_held".to_string(), format!("{:?}", numbers));
                        ForceSaleReason::HoldNotVerifiable
                    }
                    Err(e) => return Err(e),
                }
            }
            None => ForceSaleReason::UnverifiedPayer,
        };

        context.insert("reason".to_string(), reason.to_string());
        self.logger.warn(
            COMPONENT,
            "予約を確認できないため強制販売に切り替えます",
            None,
            Some(context.clone()),
        );

        let audit = ForceSaleAudit::new(reason, confirmation.transaction_id.clone())?;
        let result = self
            .number_service
            .force_mark_sold(
                confirmation.raffle_id,
                selection.numbers().to_vec(),
                ticket,
                Actor::System(SystemPrincipal::PaymentReconciliation),
                audit,
            )
            .await?;

        if !result.already_sold.is_empty() {
            context.insert("already_sold".to_string(), format!("{:?}", result.already_sold));
            self.logger.warn(
                COMPONENT,
                "支払済みの番号の一部はすでに販売済みです",
                None,
                Some(context),
            );
        }

        Ok(PaymentSettlement::ForceSold {
            ticket,
            reason,
            result,
        })
    }

    /// 指定した番号がすべてこのチケットで販売済みか
    async fn is_settled_with(
        &self,
        raffle_id: RaffleId,
        selection: &NumberSelection,
        ticket: TicketId,
    ) -> Result<bool, ApplicationError> {
        let rows = self
            .number_repository
            .find_by_numbers(raffle_id, selection.numbers())
            .await?;
        Ok(rows.len() == selection.len() && rows.iter().all(|n| n.ticket() == Some(ticket)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{
        InMemoryPaymentSettlementRepository, InMemoryRaffleLookup, InMemoryRaffleNumberRepository,
        ManualClock, TracingEventPublisher, TracingLogger,
    };
    use crate::application::service::ReservationPolicy;
    use crate::domain::model::{RaffleInfo, MAX_SOURCE_EVENT_ID_LEN};
    use crate::domain::port::TicketMintingError;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // 発行回数を数えるテスト用のチケット発行者
    #[derive(Default)]
    struct CountingTicketMinter {
        minted: AtomicUsize,
    }

    impl CountingTicketMinter {
        fn minted(&self) -> usize {
            self.minted.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TicketMinter for CountingTicketMinter {
        async fn mint_ticket(
            &self,
            _raffle_id: RaffleId,
            _buyer: Option<UserId>,
        ) -> Result<TicketId, TicketMintingError> {
            self.minted.fetch_add(1, Ordering::SeqCst);
            Ok(TicketId::new())
        }
    }

    struct Fixture {
        service: PaymentConfirmationService,
        numbers: Arc<RaffleNumberApplicationService>,
        repository: Arc<InMemoryRaffleNumberRepository>,
        minter: Arc<CountingTicketMinter>,
        clock: Arc<ManualClock>,
        raffle_id: RaffleId,
    }

    async fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryRaffleNumberRepository::new());
        let lookup = Arc::new(InMemoryRaffleLookup::new());
        let clock = Arc::new(ManualClock::starting_now());
        let logger = Arc::new(TracingLogger::new());
        let minter = Arc::new(CountingTicketMinter::default());
        let raffle_id = RaffleId::new();
        lookup.insert(RaffleInfo::new(raffle_id, 10)).await;

        let numbers = Arc::new(RaffleNumberApplicationService::new(
            repository.clone(),
            lookup,
            Arc::new(TracingEventPublisher::new()),
            logger.clone(),
            clock.clone(),
            ReservationPolicy::default(),
        ));
        numbers.initialize_numbers(raffle_id).await.unwrap();

        let service = PaymentConfirmationService::new(
            numbers.clone(),
            repository.clone(),
            Arc::new(InMemoryPaymentSettlementRepository::new()),
            minter.clone(),
            logger,
        );
        Fixture {
            service,
            numbers,
            repository,
            minter,
            clock,
            raffle_id,
        }
    }

    fn confirmation(raffle_id: RaffleId, numbers: Vec<u32>, payer: Option<UserId>) -> PaymentConfirmation {
        PaymentConfirmation {
            transaction_id: "tx-1001".to_string(),
            raffle_id,
            numbers,
            payer_id: payer,
            status: PaymentStatus::Approved,
            amount: 2000,
        }
    }

    #[tokio::test]
    async fn test_declined_payment_is_ignored() {
        let f = fixture().await;
        let mut c = confirmation(f.raffle_id, vec![1], None);
        c.status = PaymentStatus::Declined;

        let settlement = f.service.handle(c).await.unwrap();
        assert!(matches!(settlement, PaymentSettlement::Ignored { .. }));
        let rows = f.repository.find_by_numbers(f.raffle_id, &[1]).await.unwrap();
        assert!(rows[0].is_available());
    }

    #[tokio::test]
    async fn test_known_holder_uses_normal_path() {
        let f = fixture().await;
        let payer = UserId::new();
        f.numbers.reserve(f.raffle_id, vec![4, 5], payer, None).await.unwrap();

        let settlement = f
            .service
            .handle(confirmation(f.raffle_id, vec![4, 5], Some(payer)))
            .await
            .unwrap();
        match settlement {
            PaymentSettlement::Sold { ticket, numbers } => {
                assert_eq!(numbers.len(), 2);
                assert!(numbers.iter().all(|n| n.ticket() == Some(ticket)));
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        assert!(f.repository.override_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_reclaimed_hold_falls_back_to_force() {
        let f = fixture().await;
        let payer = UserId::new();
        f.numbers.reserve(f.raffle_id, vec![7], payer, Some(5)).await.unwrap();
        f.clock.advance(Duration::minutes(6));
        f.numbers.release_expired(None).await.unwrap();

        let settlement = f
            .service
            .handle(confirmation(f.raffle_id, vec![7], Some(payer)))
            .await
            .unwrap();
        match settlement {
            PaymentSettlement::ForceSold { reason, result, .. } => {
                assert_eq!(reason, ForceSaleReason::HoldNotVerifiable);
                assert_eq!(result.sold.len(), 1);
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        let log = f.repository.override_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].audit.source_event_id, "tx-1001");
    }

    #[tokio::test]
    async fn test_unknown_payer_forces_sale() {
        let f = fixture().await;
        let settlement = f
            .service
            .handle(confirmation(f.raffle_id, vec![2], None))
            .await
            .unwrap();
        assert!(matches!(
            settlement,
            PaymentSettlement::ForceSold {
                reason: ForceSaleReason::UnverifiedPayer,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_notification_is_already_settled() {
        let f = fixture().await;
        f.service
            .handle(confirmation(f.raffle_id, vec![3], None))
            .await
            .unwrap();
        let again = f
            .service
            .handle(confirmation(f.raffle_id, vec![3], None))
            .await
            .unwrap();
        assert!(matches!(again, PaymentSettlement::AlreadySettled { .. }));
        assert_eq!(f.repository.override_log().await.len(), 1);
        assert_eq!(f.minter.minted(), 1);
    }

    #[tokio::test]
    async fn test_numbers_sold_to_another_buyer_are_not_a_duplicate() {
        let f = fixture().await;
        let payer = UserId::new();
        f.numbers.reserve(f.raffle_id, vec![7], payer, Some(5)).await.unwrap();
        f.clock.advance(Duration::minutes(6));
        f.numbers.release_expired(None).await.unwrap();

        let other = UserId::new();
        let other_ticket = TicketId::new();
        f.numbers.reserve(f.raffle_id, vec![7], other, None).await.unwrap();
        f.numbers.mark_sold(f.raffle_id, vec![7], other_ticket, other).await.unwrap();

        let settlement = f
            .service
            .handle(confirmation(f.raffle_id, vec![7], Some(payer)))
            .await
            .unwrap();
        match settlement {
            PaymentSettlement::ForceSold { reason, result, .. } => {
                assert_eq!(reason, ForceSaleReason::HoldNotVerifiable);
                assert!(result.sold.is_empty());
                assert_eq!(result.already_sold, vec![7]);
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        let rows = f.repository.find_by_numbers(f.raffle_id, &[7]).await.unwrap();
        assert_eq!(rows[0].ticket(), Some(other_ticket));
    }

    #[tokio::test]
    async fn test_redelivery_of_same_transaction_reuses_ticket() {
        let f = fixture().await;
        let first = f
            .service
            .handle(confirmation(f.raffle_id, vec![1], None))
            .await
            .unwrap();
        let PaymentSettlement::ForceSold { ticket, .. } = first else {
            panic!("unexpected settlement: {:?}", first);
        };

        // 同じ取引で番号が追加された再通知でも同じチケットを使う
        let second = f
            .service
            .handle(confirmation(f.raffle_id, vec![1, 2], None))
            .await
            .unwrap();
        match second {
            PaymentSettlement::ForceSold { ticket: again, result, .. } => {
                assert_eq!(again, ticket);
                assert_eq!(result.already_sold, vec![1]);
                assert_eq!(result.sold[0].ticket(), Some(ticket));
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        assert_eq!(f.minter.minted(), 1);
    }

    #[tokio::test]
    async fn test_unknown_raffle_mints_nothing() {
        let f = fixture().await;
        let result = f
            .service
            .handle(confirmation(RaffleId::new(), vec![1], Some(UserId::new())))
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
        assert_eq!(f.minter.minted(), 0);
    }

    #[tokio::test]
    async fn test_transaction_id_must_fit_audit_record() {
        let f = fixture().await;
        let mut c = confirmation(f.raffle_id, vec![1], None);
        c.transaction_id = "x".repeat(MAX_SOURCE_EVENT_ID_LEN + 1);

        let result = f.service.handle(c).await;
        assert!(matches!(result, Err(ApplicationError::InvalidArgument(_))));
        assert_eq!(f.minter.minted(), 0);
        assert!(f.repository.override_log().await.is_empty());
    }
}
