use crate::domain::error::DomainError;
use crate::domain::port::{RepositoryError, TicketMintingError};

/// アプリケーション層のエラー型
/// 呼び出し側に返すエラーを NotFound / Conflict / InvalidArgument と基盤エラーに分類する
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// 抽選が存在しない・受付停止中、または番号が範囲外
    #[error("Not found: {message}")]
    NotFound { message: String, numbers: Vec<u32> },
    /// 番号が操作に必要な状態にない
    #[error("Conflict: {message} {numbers:?}")]
    Conflict { message: String, numbers: Vec<u32> },
    /// 引数の検証失敗
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
    /// チケット発行の失敗
    #[error("Ticket minting error: {0}")]
    TicketMintingFailed(#[from] TicketMintingError),
}

impl ApplicationError {
    /// 抽選が見つからない
    pub fn raffle_not_found(raffle_id: impl std::fmt::Display) -> Self {
        ApplicationError::NotFound {
            message: format!("抽選が見つかりません: {}", raffle_id),
            numbers: Vec::new(),
        }
    }

    /// 番号が存在しない
    pub fn numbers_not_found(numbers: Vec<u32>) -> Self {
        ApplicationError::NotFound {
            message: "指定された番号が存在しません".to_string(),
            numbers,
        }
    }

    /// 番号が利用可能でない
    pub fn numbers_unavailable(numbers: Vec<u32>) -> Self {
        ApplicationError::Conflict {
            message: "numbers unavailable".to_string(),
            numbers,
        }
    }

    /// 番号がこの実行者に予約されていない
    pub fn numbers_not_reserved(numbers: Vec<u32>) -> Self {
        ApplicationError::Conflict {
            message: "numbers not reserved by this actor".to_string(),
            numbers,
        }
    }

    /// 呼び出し側が選び直すべき番号
    pub fn offending_numbers(&self) -> &[u32] {
        match self {
            ApplicationError::NotFound { numbers, .. }
            | ApplicationError::Conflict { numbers, .. } => numbers,
            _ => &[],
        }
    }
}

// ドメインエラーを呼び出し側の分類に変換
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NumbersUnavailable(numbers) => ApplicationError::numbers_unavailable(numbers),
            DomainError::NumbersNotHeldBy(numbers) => ApplicationError::numbers_not_reserved(numbers),
            DomainError::NumbersOutOfRange(numbers) => ApplicationError::numbers_not_found(numbers),
            DomainError::InvalidTransition { number, reason } => ApplicationError::Conflict {
                message: reason,
                numbers: vec![number],
            },
            DomainError::InvalidSelection(msg)
            | DomainError::InvalidHoldTtl(msg)
            | DomainError::InvalidValue(msg) => ApplicationError::InvalidArgument(msg),
        }
    }
}
