pub mod handler;
pub mod middleware;

use std::borrow::Cow;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use domain::{DomainError, DomainErrorKind};

/// API結果
type ApiResult<T> = Result<T, ApiError>;

/// APIエラー
#[derive(Debug)]
pub struct ApiError {
    /// HTTPステータスコード
    pub status_code: StatusCode,
    /// エラーメッセージ
    pub messages: Vec<Cow<'static, str>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "messages": self.messages,
        });
        (self.status_code, Json(body)).into_response()
    }
}

/// ドメインエラーをAPIエラーに変換する。
///
/// サーバーエラーはここでのみ記録する。
/// 郵便番号検索は不正な入力を空のリストとして扱うため、`Validation`は郵便番号検索からは返されない。
impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let status_code = match error.kind {
            DomainErrorKind::Validation => StatusCode::BAD_REQUEST,
            DomainErrorKind::Provider => StatusCode::BAD_GATEWAY,
            DomainErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status_code.is_server_error() {
            tracing::error!("{:?}", error);
        }
        Self {
            status_code,
            messages: error.messages,
        }
    }
}
