// 抽選番号在庫・予約エンジン
// ヘキサゴナルアーキテクチャ（ドメイン / アプリケーション / アダプター）で構成する

pub mod adapter;
pub mod application;
pub mod domain;
