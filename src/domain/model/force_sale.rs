use crate::domain::error::DomainError;
use crate::domain::model::{NumberStatus, RaffleNumber, UserId};
use serde::{Deserialize, Serialize};

use std::fmt;

/// 強制販売の理由コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceSaleReason {
    /// 支払者が特定できない決済確定通知
    UnverifiedPayer,
    /// 支払者の予約が確認できない（期限切れ・回収済みなど）
    HoldNotVerifiable,
    /// 管理者による訂正
    AdministrativeCorrection,
}

impl ForceSaleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForceSaleReason::UnverifiedPayer => "UNVERIFIED_PAYER",
            ForceSaleReason::HoldNotVerifiable => "HOLD_NOT_VERIFIABLE",
            ForceSaleReason::AdministrativeCorrection => "ADMINISTRATIVE_CORRECTION",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "UNVERIFIED_PAYER" => Ok(ForceSaleReason::UnverifiedPayer),
            "HOLD_NOT_VERIFIABLE" => Ok(ForceSaleReason::HoldNotVerifiable),
            "ADMINISTRATIVE_CORRECTION" => Ok(ForceSaleReason::AdministrativeCorrection),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な強制販売理由: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for ForceSaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 契機イベントIDの最大文字数（監査テーブルの列幅）
pub const MAX_SOURCE_EVENT_ID_LEN: usize = 128;

/// 強制販売の監査情報
/// 理由コードと、契機となった外部イベントのID（決済取引IDなど）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSaleAudit {
    pub reason: ForceSaleReason,
    pub source_event_id: String,
}

impl ForceSaleAudit {
    pub fn new(reason: ForceSaleReason, source_event_id: impl Into<String>) -> Result<Self, DomainError> {
        let source_event_id = source_event_id.into();
        Self::validate_source_event_id(&source_event_id)?;
        Ok(Self {
            reason,
            source_event_id,
        })
    }

    /// 契機イベントIDが空でなく、記録できる長さか確認する
    pub fn validate_source_event_id(source_event_id: &str) -> Result<(), DomainError> {
        if source_event_id.trim().is_empty() {
            return Err(DomainError::InvalidValue(
                "強制販売には契機となったイベントIDが必要です".to_string(),
            ));
        }
        let len = source_event_id.chars().count();
        if len > MAX_SOURCE_EVENT_ID_LEN {
            return Err(DomainError::InvalidValue(format!(
                "イベントIDは{}文字以内で指定してください（{}文字）",
                MAX_SOURCE_EVENT_ID_LEN, len
            )));
        }
        Ok(())
    }
}

/// 強制販売で上書きされた番号の直前の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverriddenNumber {
    pub number: u32,
    pub previous_status: NumberStatus,
    pub previous_holder: Option<UserId>,
}

impl OverriddenNumber {
    pub fn from_previous(row: &RaffleNumber) -> Self {
        Self {
            number: row.number(),
            previous_status: row.status(),
            previous_holder: row.holder(),
        }
    }

    /// 他者の有効な予約を上書きしたか
    pub fn clobbered_hold(&self) -> bool {
        self.previous_status == NumberStatus::Held
    }
}

/// 強制販売の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceSaleResult {
    /// 販売済みになった番号
    pub sold: Vec<RaffleNumber>,
    /// 上書き前の状態（soldと同じ順序）
    pub overridden: Vec<OverriddenNumber>,
    /// すでに販売済みで変更しなかった番号
    pub already_sold: Vec<u32>,
    /// 行が存在しなかった番号
    pub missing: Vec<u32>,
}

impl ForceSaleResult {
    /// 他の保持者の予約を上書きした番号
    pub fn clobbered_holds(&self) -> Vec<OverriddenNumber> {
        self.overridden
            .iter()
            .copied()
            .filter(OverriddenNumber::clobbered_hold)
            .collect()
    }
}
