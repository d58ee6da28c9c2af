// 駆動する側アダプター（REST API・定期実行）

pub mod expiry_scheduler;
pub mod request_dto;
pub mod response_dto;
pub mod rest_api;

pub use expiry_scheduler::ExpiryScheduler;
pub use rest_api::{create_router, ApiError, AppState};
