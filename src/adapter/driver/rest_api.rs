use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::driver::identity::AuthenticatedUser;
use crate::adapter::driver::request_dto::{
    AddSeatsRequest, CreateClubRequest, CreateReservationRequest, UpdateClubRequest,
    UpdateSeatRequest,
};
use crate::adapter::driver::response_dto::{
    CancellationResponse, ClubResponse, ReservationResponse, SeatResponse,
};
use crate::application::service::{
    ClubApplicationService, ClubQueryService, ReservationApplicationService,
    ReservationQueryService, ReservationRequest,
};
use crate::application::{ApplicationError, ErrorKind};
use crate::domain::model::{
    BookingHours, ClubId, Money, ReservationId, ReservationStatus, SeatId, SeatNumber,
};
use crate::domain::port::{
    Clock, ClubRepository, ClubTransactionManager, PricingLookup, ReservationRepository,
    SeatRepository, SeatTransactionManager,
};

#[derive(Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub reservation_service: Arc<ReservationApplicationService>,
    pub club_service: Arc<ClubApplicationService>,
    pub reservation_query_service: Arc<ReservationQueryService>,
    pub club_query_service: Arc<ClubQueryService>,
}

impl AppState {
    /// ポート実装からサービス一式を組み立てる
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pricing: Arc<dyn PricingLookup>,
        club_repository: Arc<dyn ClubRepository>,
        seat_repository: Arc<dyn SeatRepository>,
        reservation_repository: Arc<dyn ReservationRepository>,
        transactions: Arc<dyn SeatTransactionManager>,
        club_transactions: Arc<dyn ClubTransactionManager>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
    ) -> Self {
        let reservation_service = ReservationApplicationService::new(
            pricing,
            seat_repository.clone(),
            reservation_repository.clone(),
            transactions,
            clock.clone(),
        )
        .with_store_timeout(store_timeout);
        let club_service = ClubApplicationService::new(
            club_repository.clone(),
            seat_repository.clone(),
            club_transactions,
            clock.clone(),
        )
        .with_store_timeout(store_timeout);
        let reservation_query_service =
            ReservationQueryService::new(reservation_repository, club_repository.clone(), clock)
                .with_store_timeout(store_timeout);
        let club_query_service = ClubQueryService::new(club_repository, seat_repository)
            .with_store_timeout(store_timeout);

        Self {
            reservation_service: Arc::new(reservation_service),
            club_service: Arc::new(club_service),
            reservation_query_service: Arc::new(reservation_query_service),
            club_query_service: Arc::new(club_query_service),
        }
    }
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/clubs", get(get_clubs).post(create_club))
        .route(
            "/clubs/:club_id",
            get(get_club_by_id).put(update_club).delete(delete_club),
        )
        .route("/clubs/:club_id/seats", get(get_seats).post(add_seats))
        .route("/seats", get(get_all_seats))
        .route("/seats/:seat_id", put(update_seat).delete(delete_seat))
        .route("/reservations", get(get_reservations).post(create_reservation))
        .route("/reservations/:reservation_id/cancel", put(cancel_reservation))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "computer-club-booking",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
            code: ErrorKind::InvalidArgument.as_str().to_string(),
        }),
    )
}

fn parse_club_id(raw: &str) -> ApiResult<ClubId> {
    ClubId::new(raw).map_err(|err| map_application_error(err.into()))
}

fn parse_seat_id(raw: &str) -> ApiResult<SeatId> {
    SeatId::from_string(raw).map_err(|_| bad_request("無効な座席ID形式です"))
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| bad_request(format!("無効なリクエストボディです: {}", rejection.body_text())))
}

// クラブ一覧取得エンドポイント
async fn get_clubs(State(state): State<AppState>) -> ApiResult<Json<Vec<ClubResponse>>> {
    let clubs = state
        .club_query_service
        .get_all_clubs()
        .await
        .map_err(map_application_error)?;

    Ok(Json(clubs.iter().map(ClubResponse::from_club).collect()))
}

// クラブ登録エンドポイント
async fn create_club(
    State(state): State<AppState>,
    payload: Result<Json<CreateClubRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ClubResponse>)> {
    let request = read_body(payload)?;

    let club = state
        .club_service
        .register_club(request.name, request.address, Money::new(request.price_per_hour))
        .await
        .map_err(map_application_error)?;

    Ok((StatusCode::CREATED, Json(ClubResponse::from_club(&club))))
}

// クラブ詳細取得エンドポイント
async fn get_club_by_id(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> ApiResult<Json<ClubResponse>> {
    let club_id = parse_club_id(&club_id)?;

    match state.club_query_service.get_club_by_id(&club_id).await {
        Ok(Some(club)) => Ok(Json(ClubResponse::from_club(&club))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: format!("クラブが見つかりません: {}", club_id),
                code: ErrorKind::NotFound.as_str().to_string(),
            }),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// クラブ更新エンドポイント
async fn update_club(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    payload: Result<Json<UpdateClubRequest>, JsonRejection>,
) -> ApiResult<Json<ClubResponse>> {
    let club_id = parse_club_id(&club_id)?;
    let request = read_body(payload)?;

    let club = state
        .club_service
        .update_club(
            &club_id,
            request.name,
            request.address,
            Money::new(request.price_per_hour),
        )
        .await
        .map_err(map_application_error)?;

    Ok(Json(ClubResponse::from_club(&club)))
}

// クラブ削除エンドポイント
async fn delete_club(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> ApiResult<StatusCode> {
    let club_id = parse_club_id(&club_id)?;

    state
        .club_service
        .delete_club(&club_id)
        .await
        .map_err(map_application_error)?;

    Ok(StatusCode::NO_CONTENT)
}

// 座席一覧取得エンドポイント
async fn get_seats(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> ApiResult<Json<Vec<SeatResponse>>> {
    let club_id = parse_club_id(&club_id)?;

    let seats = state
        .club_query_service
        .get_seats_by_club(&club_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(seats.iter().map(SeatResponse::from_seat).collect()))
}

// 座席追加エンドポイント
async fn add_seats(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    payload: Result<Json<AddSeatsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<SeatResponse>>)> {
    let club_id = parse_club_id(&club_id)?;
    let request = read_body(payload)?;

    let seats = state
        .club_service
        .add_seats(&club_id, request.count, request.description.unwrap_or_default())
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(seats.iter().map(SeatResponse::from_seat).collect()),
    ))
}

// 全座席一覧取得エンドポイント
async fn get_all_seats(State(state): State<AppState>) -> ApiResult<Json<Vec<SeatResponse>>> {
    let seats = state
        .club_query_service
        .get_all_seats()
        .await
        .map_err(map_application_error)?;

    Ok(Json(seats.iter().map(SeatResponse::from_seat).collect()))
}

// 座席更新エンドポイント
async fn update_seat(
    State(state): State<AppState>,
    Path(seat_id): Path<String>,
    payload: Result<Json<UpdateSeatRequest>, JsonRejection>,
) -> ApiResult<Json<SeatResponse>> {
    let seat_id = parse_seat_id(&seat_id)?;
    let request = read_body(payload)?;

    let seat = state
        .club_service
        .update_seat(seat_id, request.description)
        .await
        .map_err(map_application_error)?;

    Ok(Json(SeatResponse::from_seat(&seat)))
}

// 座席削除エンドポイント
async fn delete_seat(
    State(state): State<AppState>,
    Path(seat_id): Path<String>,
) -> ApiResult<StatusCode> {
    let seat_id = parse_seat_id(&seat_id)?;

    state
        .club_service
        .delete_seat(seat_id)
        .await
        .map_err(map_application_error)?;

    Ok(StatusCode::NO_CONTENT)
}

// 自分の予約一覧取得エンドポイント
async fn get_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<Vec<ReservationResponse>>> {
    let views = state
        .reservation_query_service
        .get_user_reservations(&user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(views.iter().map(ReservationResponse::from_view).collect()))
}

// 予約作成エンドポイント
async fn create_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReservationResponse>)> {
    let request = read_body(payload)?;

    let reservation_request = ReservationRequest {
        club_id: parse_club_id(&request.club_id)?,
        seat_number: SeatNumber::new(request.seat_number)
            .map_err(|err| map_application_error(err.into()))?,
        user_id,
        start_time: request.start_time,
        hours: BookingHours::new(request.hours).map_err(|err| map_application_error(err.into()))?,
    };

    let reservation = state
        .reservation_service
        .reserve(reservation_request)
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::from_reservation(
            &reservation,
            reservation.status(),
            None,
        )),
    ))
}

// 予約キャンセルエンドポイント
async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(reservation_id): Path<String>,
) -> ApiResult<Json<CancellationResponse>> {
    let reservation_id = ReservationId::from_string(&reservation_id)
        .map_err(|_| bad_request("無効な予約ID形式です"))?;

    state
        .reservation_service
        .cancel(reservation_id, &user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(CancellationResponse {
        reservation_id: reservation_id.to_string(),
        status: ReservationStatus::Cancelled.to_string(),
    }))
}

/// エラー種別に対応するHTTPステータス
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::FailedPrecondition => StatusCode::CONFLICT,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::Aborted => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let kind = err.kind();
    match kind {
        ErrorKind::Internal => tracing::error!(error = %err, "request failed"),
        ErrorKind::Unavailable | ErrorKind::Aborted => {
            tracing::warn!(error = %err, retryable = err.is_retryable(), "request failed")
        }
        _ => {}
    }

    (
        status_for(kind),
        Json(ApiError {
            error: err.to_string(),
            code: kind.as_str().to_string(),
        }),
    )
}

#[cfg(test)]
mod error_handling_tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::port::RepositoryError;

    #[test]
    fn test_map_application_error_not_found() {
        let app_error = ApplicationError::NotFound("予約が見つかりません".to_string());
        let (status, Json(api_error)) = map_application_error(app_error);

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.code, "NOT_FOUND");
        assert!(api_error.error.contains("予約が見つかりません"));
    }

    #[test]
    fn test_business_rule_violations() {
        let (status, Json(body)) =
            map_application_error(DomainError::OverlappingReservation.into());
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "FAILED_PRECONDITION");

        let (status, Json(body)) = map_application_error(DomainError::NotReservationOwner.into());
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "PERMISSION_DENIED");

        let (status, _) = map_application_error(DomainError::StartTimeNotInFuture.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_failures() {
        let (status, Json(body)) = map_application_error(ApplicationError::Timeout(
            "begin_seat_transaction".to_string(),
        ));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code, "UNAVAILABLE");

        let (status, Json(body)) =
            map_application_error(RepositoryError::Conflict("deadlock".to_string()).into());
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "ABORTED");

        let (status, _) =
            map_application_error(RepositoryError::FetchFailed("bad row".to_string()).into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, Json(body)) = map_application_error(
            RepositoryError::ConstraintViolation("duplicate seat".to_string()).into(),
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "FAILED_PRECONDITION");
    }

    #[test]
    fn test_api_error_structure() {
        let api_error = ApiError {
            error: "テストエラー".to_string(),
            code: "TEST_ERROR".to_string(),
        };

        let json = serde_json::to_string(&api_error).unwrap();
        let deserialized: ApiError = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.error, "テストエラー");
        assert_eq!(deserialized.code, "TEST_ERROR");
    }
}
