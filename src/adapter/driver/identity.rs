use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json,
};

use crate::adapter::driver::rest_api::ApiError;
use crate::domain::model::UserId;

/// 認証済み利用者IDを運ぶヘッダー
/// 前段の認証ゲートウェイが検証済みのIDを設定する
pub const USER_ID_HEADER: &str = "x-user-id";

/// 認証済みの利用者
/// ヘッダーがない、または空の場合は 401 で拒否する
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| UserId::new(value.trim()).ok())
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiError {
                        error: "利用者IDヘッダーがありません".to_string(),
                        code: "UNAUTHENTICATED".to_string(),
                    }),
                )
            })
    }
}
