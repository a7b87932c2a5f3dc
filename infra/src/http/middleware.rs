use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::CACHE_CONTROL},
    middleware::Next,
    response::Response,
};

use settings::CacheSettings;

/// 成功したレスポンスに、キャッシュしてよいことを示す`Cache-Control`ヘッダーを追加するミドルウェア
///
/// キャッシュのキーはURL全体であるため、郵便番号検索のレスポンスは市と州の組み合わせごとにキャッシュされる。
/// ハンドラが`Cache-Control`ヘッダーを設定した場合や、成功以外のレスポンスには追加しない。
pub async fn cache_control_middleware(
    State(settings): State<CacheSettings>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if !response.status().is_success() || response.headers().contains_key(CACHE_CONTROL) {
        return response;
    }
    match HeaderValue::from_str(&format!("public, max-age={}", settings.max_age)) {
        Ok(value) => {
            response.headers_mut().insert(CACHE_CONTROL, value);
        }
        Err(e) => tracing::error!("Failed to build the cache control header: {}", e),
    }
    response
}
