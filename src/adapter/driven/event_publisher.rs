use crate::domain::event::InventoryEvent;
use crate::domain::model::OverriddenNumber;
use crate::domain::port::{EventPublisher, PublisherError};

fn describe_overrides(overridden: &[OverriddenNumber]) -> String {
    overridden
        .iter()
        .map(|o| match o.previous_holder {
            Some(holder) => format!("{}({} by {})", o.number, o.previous_status, holder),
            None => format!("{}({})", o.number, o.previous_status),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// tracingイベント発行者
/// ドメインイベントを構造化ログとして出力する
///
/// 強制販売は他者の予約を上書きし得るため警告レベルで出力する。
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    /// 新しいイベント発行者を作成
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: &InventoryEvent) -> Result<(), PublisherError> {
        let event_type = event.event_type();
        match event {
            InventoryEvent::NumbersHeld(e) => {
                tracing::info!(
                    event_type,
                    raffle_id = %e.raffle_id,
                    holder = %e.holder,
                    numbers = ?e.numbers,
                    expires_at = %e.expires_at.to_rfc3339(),
                    occurred_at = %e.occurred_at.to_rfc3339(),
                    "番号を予約しました"
                );
            }
            InventoryEvent::NumbersSold(e) => {
                tracing::info!(
                    event_type,
                    raffle_id = %e.raffle_id,
                    holder = %e.holder,
                    ticket = %e.ticket,
                    numbers = ?e.numbers,
                    occurred_at = %e.occurred_at.to_rfc3339(),
                    "番号を販売済みにしました"
                );
            }
            InventoryEvent::NumbersForceSold(e) => {
                tracing::warn!(
                    event_type,
                    raffle_id = %e.raffle_id,
                    ticket = %e.ticket,
                    actor = %e.actor,
                    reason = %e.audit.reason,
                    source_event_id = %e.audit.source_event_id,
                    overridden = %describe_overrides(&e.overridden),
                    already_sold = ?e.already_sold,
                    occurred_at = %e.occurred_at.to_rfc3339(),
                    "保持者を確認せずに番号を販売済みにしました"
                );
            }
            InventoryEvent::ExpiredHoldsReleased(e) => {
                let scope = e
                    .raffle_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "all".to_string());
                tracing::info!(
                    event_type,
                    raffle_id = %scope,
                    released_count = e.released_count,
                    occurred_at = %e.occurred_at.to_rfc3339(),
                    "期限切れの予約を回収しました"
                );
            }
        }
        Ok(())
    }
}
