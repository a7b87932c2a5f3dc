/// HTTPトランスポート
///
/// 郵便番号プロバイダーにHTTPリクエストを送信して、そのレスポンスを返す。
/// 本番では`reqwest::Client`を使用し、テストではネットワークに接続しない実装に置き換える。
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

#[async_trait::async_trait]
impl HttpTransport for reqwest::Client {
    async fn send(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.execute(request).await
    }
}
