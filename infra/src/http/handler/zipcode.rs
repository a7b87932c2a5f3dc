use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use domain::models::ZipCode;

use crate::{
    AppState,
    http::{ApiError, ApiResult},
};

use super::zip_code_use_case;

/// 郵便番号検索のクエリパラメーター
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZipCodeQueryParams {
    /// 市
    pub city: Option<String>,
    /// 州
    pub state: Option<String>,
}

/// 郵便番号検索ハンドラ
///
/// 市または州が指定されていない場合は空のリストを返す。
#[tracing::instrument(skip(app_state))]
pub async fn list(
    State(app_state): State<AppState>,
    query: Query<ZipCodeQueryParams>,
) -> ApiResult<Json<Vec<ZipCode>>> {
    let ZipCodeQueryParams { city, state } = query.0;
    let use_case = zip_code_use_case(&app_state);
    let zip_codes = use_case.lookup(city, state).await.map_err(ApiError::from)?;
    Ok(Json(zip_codes))
}
