// ドメイン層
// 抽選番号の状態遷移とビジネスルールを定義する

pub mod error;
pub mod event;
pub mod model;
pub mod port;
