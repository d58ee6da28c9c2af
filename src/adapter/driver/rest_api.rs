use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::driver::request_dto::{
    ForceSellNumbersRequest, PaymentConfirmationRequest, ReleaseExpiredParams,
    ReserveNumbersRequest, SellNumbersRequest,
};
use crate::adapter::driver::response_dto::{
    ForceSaleResponse, InitializeNumbersResponse, NumberBoardResponse, PaymentSettlementResponse,
    RaffleNumberResponse, ReleaseExpiredResponse, SoldNumbersResponse,
};
use crate::application::service::{
    PaymentConfirmation, PaymentConfirmationService, RaffleNumberApplicationService,
    RaffleNumberQueryService,
};
use crate::application::ApplicationError;
use crate::domain::model::{Actor, ForceSaleAudit, ForceSaleReason, RaffleId, TicketId, UserId};
use crate::domain::port::RepositoryError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    /// 呼び出し側が選び直すべき番号
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numbers: Vec<u32>,
}

type ApiFailure = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, ApiFailure>;

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub number_service: Arc<RaffleNumberApplicationService>,
    pub query_service: Arc<RaffleNumberQueryService>,
    pub payment_service: Arc<PaymentConfirmationService>,
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/raffles/:raffle_id/numbers/initialize", post(initialize_numbers))
        .route("/raffles/:raffle_id/numbers", get(get_all_numbers))
        .route("/raffles/:raffle_id/numbers/available", get(get_available_numbers))
        .route("/raffles/:raffle_id/numbers/sold", get(get_sold_numbers))
        .route("/raffles/:raffle_id/numbers/held/:holder_id", get(get_held_numbers))
        .route("/raffles/:raffle_id/numbers/reserve", post(reserve_numbers))
        .route("/raffles/:raffle_id/numbers/sell", post(sell_numbers))
        .route("/raffles/:raffle_id/numbers/force-sell", post(force_sell_numbers))
        .route("/numbers/release-expired", post(release_expired))
        .route("/payments/confirmations", post(confirm_payment))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// 番号生成エンドポイント
async fn initialize_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
) -> Result<(StatusCode, Json<InitializeNumbersResponse>), ApiFailure> {
    let raffle_id = RaffleId::from_uuid(raffle_id);
    let created = state
        .number_service
        .initialize_numbers(raffle_id)
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(InitializeNumbersResponse {
            raffle_id: raffle_id.to_string(),
            created,
        }),
    ))
}

// 番号一覧取得エンドポイント
async fn get_all_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
) -> ApiResult<NumberBoardResponse> {
    let raffle_id = RaffleId::from_uuid(raffle_id);
    let board = state
        .query_service
        .get_all(raffle_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(NumberBoardResponse::from_board(raffle_id, &board)))
}

// 利用可能な番号取得エンドポイント
async fn get_available_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
) -> ApiResult<Vec<RaffleNumberResponse>> {
    let numbers = state
        .query_service
        .get_available(RaffleId::from_uuid(raffle_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(RaffleNumberResponse::from_numbers(&numbers)))
}

// 販売済み番号取得エンドポイント
async fn get_sold_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
) -> ApiResult<SoldNumbersResponse> {
    let raffle_id = RaffleId::from_uuid(raffle_id);
    let numbers = state
        .query_service
        .get_sold_numbers(raffle_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(SoldNumbersResponse {
        raffle_id: raffle_id.to_string(),
        numbers,
    }))
}

// 保持者ごとの予約中番号取得エンドポイント
async fn get_held_numbers(
    State(state): State<AppState>,
    Path((raffle_id, holder_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<RaffleNumberResponse>> {
    let numbers = state
        .query_service
        .get_held_by(RaffleId::from_uuid(raffle_id), UserId::from_uuid(holder_id))
        .await
        .map_err(map_application_error)?;
    Ok(Json(RaffleNumberResponse::from_numbers(&numbers)))
}

// 番号予約エンドポイント
async fn reserve_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
    Json(request): Json<ReserveNumbersRequest>,
) -> ApiResult<Vec<RaffleNumberResponse>> {
    let held = state
        .number_service
        .reserve(
            RaffleId::from_uuid(raffle_id),
            request.numbers,
            UserId::from_uuid(request.holder_id),
            request.ttl_minutes,
        )
        .await
        .map_err(map_application_error)?;
    Ok(Json(RaffleNumberResponse::from_numbers(&held)))
}

// 販売確定エンドポイント
async fn sell_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
    Json(request): Json<SellNumbersRequest>,
) -> ApiResult<Vec<RaffleNumberResponse>> {
    let sold = state
        .number_service
        .mark_sold(
            RaffleId::from_uuid(raffle_id),
            request.numbers,
            TicketId::from_uuid(request.ticket_id),
            UserId::from_uuid(request.holder_id),
        )
        .await
        .map_err(map_application_error)?;
    Ok(Json(RaffleNumberResponse::from_numbers(&sold)))
}

// 強制販売エンドポイント
async fn force_sell_numbers(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
    Json(request): Json<ForceSellNumbersRequest>,
) -> ApiResult<ForceSaleResponse> {
    let actor = Actor::from_string(&request.actor).map_err(|e| bad_request("INVALID_ACTOR", e))?;
    actor
        .ensure_may_force_sell()
        .map_err(|e| bad_request("INVALID_ACTOR", e))?;
    let reason =
        ForceSaleReason::from_string(&request.reason).map_err(|e| bad_request("INVALID_REASON", e))?;
    let audit = ForceSaleAudit::new(reason, request.source_event_id)
        .map_err(|e| bad_request("INVALID_ARGUMENT", e))?;
    let ticket = TicketId::from_uuid(request.ticket_id);

    let result = state
        .number_service
        .force_mark_sold(RaffleId::from_uuid(raffle_id), request.numbers, ticket, actor, audit)
        .await
        .map_err(map_application_error)?;
    Ok(Json(ForceSaleResponse::from_result(ticket, &result)))
}

// 期限切れ回収エンドポイント
async fn release_expired(
    State(state): State<AppState>,
    Query(params): Query<ReleaseExpiredParams>,
) -> ApiResult<ReleaseExpiredResponse> {
    let released = state
        .number_service
        .release_expired(params.raffle_id.map(RaffleId::from_uuid))
        .await
        .map_err(map_application_error)?;
    Ok(Json(ReleaseExpiredResponse { released }))
}

// 決済確定通知エンドポイント
async fn confirm_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentConfirmationRequest>,
) -> ApiResult<PaymentSettlementResponse> {
    let settlement = state
        .payment_service
        .handle(PaymentConfirmation {
            transaction_id: request.transaction_id,
            raffle_id: RaffleId::from_uuid(request.raffle_id),
            numbers: request.numbers,
            payer_id: request.payer_id.map(UserId::from_uuid),
            status: request.status,
            amount: request.amount,
        })
        .await
        .map_err(map_application_error)?;
    Ok(Json(PaymentSettlementResponse::from_settlement(&settlement)))
}

fn bad_request(code: &str, err: impl std::fmt::Display) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: err.to_string(),
            code: code.to_string(),
            numbers: Vec::new(),
        }),
    )
}

// アプリケーションエラーをHTTPステータスコードとエラーコードにマッピング
fn map_application_error(err: ApplicationError) -> ApiFailure {
    let numbers = err.offending_numbers().to_vec();
    let (status, code) = match &err {
        ApplicationError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ApplicationError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        ApplicationError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        ApplicationError::RepositoryError(RepositoryError::ConnectionFailed(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "REPOSITORY_UNAVAILABLE")
        }
        ApplicationError::RepositoryError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR"),
        ApplicationError::TicketMintingFailed(_) => (StatusCode::BAD_GATEWAY, "TICKET_MINTING_ERROR"),
    };
    if status.is_server_error() {
        tracing::error!(code, error = %err, "リクエストの処理に失敗しました");
    }

    (
        status,
        Json(ApiError {
            error: err.to_string(),
            code: code.to_string(),
            numbers,
        }),
    )
}
