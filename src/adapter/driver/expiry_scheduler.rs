use crate::application::service::RaffleNumberApplicationService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// 期限切れ予約の定期回収
/// 一定間隔ですべての抽選の期限切れ予約を利用可能に戻す
///
/// 回収が失敗しても次の周期で再試行する。停止はシャットダウン通知で行う。
pub struct ExpiryScheduler {
    number_service: Arc<RaffleNumberApplicationService>,
    interval: Duration,
}

impl ExpiryScheduler {
    pub fn new(number_service: Arc<RaffleNumberApplicationService>, interval: Duration) -> Self {
        Self {
            number_service,
            interval,
        }
    }

    /// バックグラウンドタスクとして起動する
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// シャットダウン通知を受けるまで回収を繰り返す
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_seconds = self.interval.as_secs(), "期限切れ予約の定期回収を開始します");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.number_service.release_expired(None).await {
                        Ok(released) => tracing::debug!(released, "定期回収が完了しました"),
                        Err(e) => tracing::error!(error = %e, "定期回収に失敗しました"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("期限切れ予約の定期回収を停止しました");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{
        InMemoryRaffleLookup, InMemoryRaffleNumberRepository, ManualClock, TracingEventPublisher,
        TracingLogger,
    };
    use crate::application::service::ReservationPolicy;
    use crate::domain::model::{RaffleId, RaffleInfo, UserId};
    use crate::domain::port::RaffleNumberRepository;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_scheduler_reclaims_and_stops() {
        let repository = Arc::new(InMemoryRaffleNumberRepository::new());
        let lookup = Arc::new(InMemoryRaffleLookup::new());
        let clock = Arc::new(ManualClock::starting_now());
        let raffle_id = RaffleId::new();
        lookup.insert(RaffleInfo::new(raffle_id, 5)).await;

        let service = Arc::new(RaffleNumberApplicationService::new(
            repository.clone(),
            lookup,
            Arc::new(TracingEventPublisher::new()),
            Arc::new(TracingLogger::new()),
            clock.clone(),
            ReservationPolicy::default(),
        ));
        service.initialize_numbers(raffle_id).await.unwrap();
        service
            .reserve(raffle_id, vec![2, 3], UserId::new(), Some(1))
            .await
            .unwrap();
        clock.advance(ChronoDuration::minutes(2));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ExpiryScheduler::new(service, Duration::from_millis(10)).spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let rows = repository.find_by_numbers(raffle_id, &[2, 3]).await.unwrap();
        assert!(rows.iter().all(|n| n.is_available()));
    }
}
