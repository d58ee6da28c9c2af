use crate::application::service::{NumberBoard, PaymentSettlement};
use crate::domain::model::{ForceSaleResult, NumberCounts, OverriddenNumber, RaffleId, RaffleNumber, TicketId};
use serde::Serialize;

/// 抽選番号用のレスポンスDTO
#[derive(Serialize)]
pub struct RaffleNumberResponse {
    pub id: String,
    pub raffle_id: String,
    pub number: u32,
    pub status: String,
    pub holder_id: Option<String>,
    pub hold_expires_at: Option<String>,
    pub ticket_id: Option<String>,
    pub updated_by: String,
    pub updated_at: String,
}

impl RaffleNumberResponse {
    /// ドメインオブジェクトからRaffleNumberResponseを作成
    pub fn from_number(number: &RaffleNumber) -> Self {
        let audit = number.audit();
        Self {
            id: number.id().to_string(),
            raffle_id: number.raffle_id().to_string(),
            number: number.number(),
            status: number.status().to_string(),
            holder_id: number.holder().map(|h| h.to_string()),
            hold_expires_at: number.hold_expires_at().map(|t| t.to_rfc3339()),
            ticket_id: number.ticket().map(|t| t.to_string()),
            updated_by: audit.updated_by.to_string(),
            updated_at: audit.updated_at.to_rfc3339(),
        }
    }

    pub fn from_numbers(numbers: &[RaffleNumber]) -> Vec<Self> {
        numbers.iter().map(Self::from_number).collect()
    }
}

/// 番号一覧と集計用のレスポンスDTO
#[derive(Serialize)]
pub struct NumberBoardResponse {
    pub raffle_id: String,
    pub counts: NumberCounts,
    pub total: u64,
    pub numbers: Vec<RaffleNumberResponse>,
}

impl NumberBoardResponse {
    pub fn from_board(raffle_id: RaffleId, board: &NumberBoard) -> Self {
        Self {
            raffle_id: raffle_id.to_string(),
            counts: board.counts,
            total: board.counts.total(),
            numbers: RaffleNumberResponse::from_numbers(&board.numbers),
        }
    }
}

/// 販売済み番号用のレスポンスDTO
/// 保持者やチケットは含めない
#[derive(Serialize)]
pub struct SoldNumbersResponse {
    pub raffle_id: String,
    pub numbers: Vec<u32>,
}

/// 番号生成用のレスポンスDTO
#[derive(Serialize)]
pub struct InitializeNumbersResponse {
    pub raffle_id: String,
    pub created: u64,
}

/// 期限切れ回収用のレスポンスDTO
#[derive(Serialize)]
pub struct ReleaseExpiredResponse {
    pub released: u64,
}

/// 上書きされた番号用のレスポンスDTO
#[derive(Serialize)]
pub struct OverriddenNumberResponse {
    pub number: u32,
    pub previous_status: String,
    pub previous_holder_id: Option<String>,
}

impl OverriddenNumberResponse {
    fn from_overridden(overridden: &OverriddenNumber) -> Self {
        Self {
            number: overridden.number,
            previous_status: overridden.previous_status.to_string(),
            previous_holder_id: overridden.previous_holder.map(|h| h.to_string()),
        }
    }
}

/// 強制販売用のレスポンスDTO
#[derive(Serialize)]
pub struct ForceSaleResponse {
    pub ticket_id: String,
    pub sold: Vec<RaffleNumberResponse>,
    pub overridden: Vec<OverriddenNumberResponse>,
    pub already_sold: Vec<u32>,
    pub missing: Vec<u32>,
}

impl ForceSaleResponse {
    pub fn from_result(ticket: TicketId, result: &ForceSaleResult) -> Self {
        Self {
            ticket_id: ticket.to_string(),
            sold: RaffleNumberResponse::from_numbers(&result.sold),
            overridden: result
                .overridden
                .iter()
                .map(OverriddenNumberResponse::from_overridden)
                .collect(),
            already_sold: result.already_sold.clone(),
            missing: result.missing.clone(),
        }
    }
}

/// 決済確定通知の処理結果用のレスポンスDTO
#[derive(Serialize)]
pub struct PaymentSettlementResponse {
    /// `IGNORED` / `ALREADY_SETTLED` / `SOLD` / `FORCE_SOLD`
    pub outcome: String,
    pub ticket_id: Option<String>,
    pub reason: Option<String>,
    pub numbers: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_sale: Option<ForceSaleResponse>,
}

impl PaymentSettlementResponse {
    pub fn from_settlement(settlement: &PaymentSettlement) -> Self {
        match settlement {
            PaymentSettlement::Ignored { status } => Self {
                outcome: "IGNORED".to_string(),
                ticket_id: None,
                reason: Some(format!("{:?}", status).to_uppercase()),
                numbers: Vec::new(),
                force_sale: None,
            },
            PaymentSettlement::AlreadySettled { numbers } => Self {
                outcome: "ALREADY_SETTLED".to_string(),
                ticket_id: None,
                reason: None,
                numbers: numbers.clone(),
                force_sale: None,
            },
            PaymentSettlement::Sold { ticket, numbers } => Self {
                outcome: "SOLD".to_string(),
                ticket_id: Some(ticket.to_string()),
                reason: None,
                numbers: numbers.iter().map(RaffleNumber::number).collect(),
                force_sale: None,
            },
            PaymentSettlement::ForceSold {
                ticket,
                reason,
                result,
            } => Self {
                outcome: "FORCE_SOLD".to_string(),
                ticket_id: Some(ticket.to_string()),
                reason: Some(reason.to_string()),
                numbers: result.sold.iter().map(RaffleNumber::number).collect(),
                force_sale: Some(ForceSaleResponse::from_result(*ticket, result)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Actor, SystemPrincipal, UserId};
    use chrono::{Duration, Utc};

    #[test]
    fn test_held_number_response() {
        let now = Utc::now();
        let holder = UserId::new();
        let number = RaffleNumber::new_available(
            RaffleId::new(),
            12,
            Actor::System(SystemPrincipal::RaffleSetup),
            now,
        )
        .hold(holder, now + Duration::minutes(15), now)
        .unwrap();

        let response = RaffleNumberResponse::from_number(&number);
        assert_eq!(response.number, 12);
        assert_eq!(response.status, "HELD");
        assert_eq!(response.holder_id, Some(holder.to_string()));
        assert_eq!(response.updated_by, format!("user:{}", holder));
        assert!(response.ticket_id.is_none());
    }

    #[test]
    fn test_board_serializes_counts() {
        let raffle_id = RaffleId::new();
        let number = RaffleNumber::new_available(
            raffle_id,
            1,
            Actor::System(SystemPrincipal::RaffleSetup),
            Utc::now(),
        );
        let mut counts = NumberCounts::default();
        counts.record(number.status());
        let board = NumberBoard {
            numbers: vec![number],
            counts,
        };

        let json = serde_json::to_value(NumberBoardResponse::from_board(raffle_id, &board)).unwrap();
        assert_eq!(json["counts"]["available"], 1);
        assert_eq!(json["total"], 1);
        assert_eq!(json["numbers"][0]["status"], "AVAILABLE");
    }
}
