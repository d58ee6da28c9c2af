use crate::application::service::PaymentStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 番号予約用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct ReserveNumbersRequest {
    pub holder_id: Uuid,
    pub numbers: Vec<u32>,
    /// 保持期間（分）。省略時は既定値
    pub ttl_minutes: Option<i64>,
}

/// 販売確定用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct SellNumbersRequest {
    pub holder_id: Uuid,
    pub numbers: Vec<u32>,
    pub ticket_id: Uuid,
}

/// 強制販売用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct ForceSellNumbersRequest {
    pub numbers: Vec<u32>,
    pub ticket_id: Uuid,
    /// `user:<uuid>` または `system:<name>`
    pub actor: String,
    /// `UNVERIFIED_PAYER` / `HOLD_NOT_VERIFIABLE` / `ADMINISTRATIVE_CORRECTION`
    pub reason: String,
    pub source_event_id: String,
}

/// 決済確定通知用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct PaymentConfirmationRequest {
    pub transaction_id: String,
    pub raffle_id: Uuid,
    pub numbers: Vec<u32>,
    pub payer_id: Option<Uuid>,
    pub status: PaymentStatus,
    pub amount: i64,
}

/// 期限切れ回収用のクエリパラメータ
#[derive(Deserialize)]
pub struct ReleaseExpiredParams {
    pub raffle_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_request_ttl_is_optional() {
        let json = format!(r#"{{"holder_id":"{}","numbers":[3,4]}}"#, Uuid::new_v4());
        let request: ReserveNumbersRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.numbers, vec![3, 4]);
        assert!(request.ttl_minutes.is_none());
    }

    #[test]
    fn test_payment_status_uses_upper_snake_case() {
        let json = format!(
            r#"{{"transaction_id":"tx-1","raffle_id":"{}","numbers":[1],"payer_id":null,"status":"APPROVED","amount":500}}"#,
            Uuid::new_v4()
        );
        let request: PaymentConfirmationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.status, PaymentStatus::Approved);
        assert!(request.payer_id.is_none());
    }

    #[test]
    fn test_negative_number_is_rejected() {
        let json = format!(r#"{{"holder_id":"{}","numbers":[-1]}}"#, Uuid::new_v4());
        assert!(serde_json::from_str::<ReserveNumbersRequest>(&json).is_err());
    }
}
