use secrecy::SecretString;

use domain::DomainResult;
use settings::ProviderSettings;

/// APIキープロバイダー
///
/// 郵便番号プロバイダーに問い合わせるたびに呼び出され、その時点のAPIキーを返す。
pub trait ApiKeyProvider: Send + Sync {
    fn api_key(&self) -> DomainResult<SecretString>;
}

/// アプリケーション設定から読み込んだAPIキー
#[derive(Debug, Clone)]
pub struct StaticApiKey(SecretString);

impl StaticApiKey {
    pub fn new(api_key: SecretString) -> Self {
        Self(api_key)
    }
}

impl From<&ProviderSettings> for StaticApiKey {
    fn from(settings: &ProviderSettings) -> Self {
        Self::new(settings.api_key.clone())
    }
}

impl ApiKeyProvider for StaticApiKey {
    fn api_key(&self) -> DomainResult<SecretString> {
        Ok(self.0.clone())
    }
}
