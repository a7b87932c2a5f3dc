pub mod http;
pub mod provider;

use std::sync::Arc;

use settings::AppSettings;

use crate::provider::{ApiKeyProvider, HttpTransport};

#[derive(Clone)]
pub struct AppState {
    pub app_settings: AppSettings,
    /// 郵便番号プロバイダーへのHTTPリクエストを送信するトランスポート
    pub transport: Arc<dyn HttpTransport>,
    /// 郵便番号プロバイダーのAPIキーを提供するプロバイダー
    pub api_key_provider: Arc<dyn ApiKeyProvider>,
}
