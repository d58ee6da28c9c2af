/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// 予約対象の番号が利用可能状態ではない
    #[error("Numbers unavailable: {0:?}")]
    NumbersUnavailable(Vec<u32>),
    /// 販売対象の番号が指定された保持者に予約されていない
    #[error("Numbers not reserved by this actor: {0:?}")]
    NumbersNotHeldBy(Vec<u32>),
    /// 抽選の番号範囲外、または行が存在しない
    #[error("Numbers out of range: {0:?}")]
    NumbersOutOfRange(Vec<u32>),
    /// 無効な番号の指定（空、重複、上限超過）
    #[error("Invalid number selection: {0}")]
    InvalidSelection(String),
    /// 無効な保持期間
    #[error("Invalid hold ttl: {0}")]
    InvalidHoldTtl(String),
    /// 許可されていない状態遷移
    #[error("Invalid transition for number {number}: {reason}")]
    InvalidTransition { number: u32, reason: String },
    /// 無効な値
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
