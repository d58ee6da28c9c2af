// アプリケーション層
// ユースケースの実行とエラーの分類を担当する

pub mod error;
pub mod service;

pub use error::ApplicationError;
