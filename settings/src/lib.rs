use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// アプリケーション設定
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// HTTPサーバー設定
    pub http: HttpSettings,
    /// 郵便番号プロバイダー設定
    pub provider: ProviderSettings,
    /// レスポンスキャッシュ設定
    #[serde(default)]
    pub cache: CacheSettings,
    /// ログ設定
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename = "protocol")]
#[serde(rename_all = "lowercase")]
pub enum HttpProtocol {
    /// HTTPプロトコル
    Http,
    /// HTTPSプロトコル
    Https,
}

impl std::fmt::Display for HttpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

/// HTTPサーバー設定
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// プロトコル
    pub protocol: HttpProtocol,
    /// ホスト名
    pub host: String,
    /// ポート番号
    pub port: u16,
}

impl HttpSettings {
    /// バインドするアドレス（ホスト名とポート番号）を返す。
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 郵便番号プロバイダー設定
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// ベースURL（例: `https://us-zipcode.api.smartystreets.com`）
    pub base_url: String,
    /// APIキー
    pub api_key: SecretString,
    /// リクエストタイムアウト（秒）
    #[serde(default = "default_provider_timeout")]
    pub timeout: u64,
}

fn default_provider_timeout() -> u64 {
    10
}

/// レスポンスキャッシュ設定
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheSettings {
    /// キャッシュの有効期間（秒）
    pub max_age: u32,
}

/// 郵便番号のルックアップ結果をキャッシュしてよい期間（24時間）
pub const DEFAULT_CACHE_MAX_AGE: u32 = 86_400;

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_CACHE_MAX_AGE,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LoggingSettings {
    /// ログレベル
    ///
    /// `info`や`DEBUG`のように、大文字と小文字を区別せずに指定できる。
    #[serde(deserialize_with = "deserialize_log_level")]
    pub level: log::Level,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<log::Level, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: log::Level::Info,
        }
    }
}
