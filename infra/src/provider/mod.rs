mod credentials;
mod transport;

pub use credentials::*;
pub use transport::*;

use std::sync::Arc;

use reqwest::{
    Method, Url,
    header::{self, HeaderValue},
};
use secrecy::ExposeSecret as _;
use serde::Deserialize;

use domain::{
    DomainError, DomainErrorKind, DomainResult,
    models::{LookupOutcome, LookupRequest, ZipCode},
    providers::ZipCodeProvider,
};

/// 郵便番号検索APIのパス
pub const LOOKUP_PATH: &str = "/lookup";

/// 郵便番号プロバイダーに送信するAcceptヘッダーの値
pub const ACCEPT: &str = "application/vnd.github.v3+json";

/// 郵便番号プロバイダーに送信するUser-Agentヘッダーの値
pub const USER_AGENT: &str = "zipcode-finder";

/// 郵便番号プロバイダーが入力ごとに返す検索結果
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResult {
    /// 入力のインデックス
    pub input_index: Option<u32>,
    /// 検索の状態（例: `valid_state`、`invalid_state`）
    pub status: Option<String>,
    /// 郵便番号リスト
    pub zipcodes: Option<Vec<ProviderZipCode>>,
    /// 郵便番号が見つからなかった理由
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderZipCode {
    pub zipcode: String,
}

/// HTTP APIで郵便番号を検索するプロバイダー
pub struct HttpZipCodeProvider {
    /// 郵便番号プロバイダーのベースURL
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    api_key_provider: Arc<dyn ApiKeyProvider>,
}

impl HttpZipCodeProvider {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        api_key_provider: Arc<dyn ApiKeyProvider>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            api_key_provider,
        }
    }

    /// 郵便番号プロバイダーに送信するリクエストを構築する。
    ///
    /// APIキーは呼び出されるたびにAPIキープロバイダーから取得する。
    /// クエリパラメーターはURLエンコードされる。
    fn build_request(&self, request: &LookupRequest) -> DomainResult<reqwest::Request> {
        let api_key = self.api_key_provider.api_key()?;
        let endpoint = format!("{}{}", self.base_url.trim_end_matches('/'), LOOKUP_PATH);
        let url = Url::parse_with_params(
            &endpoint,
            [
                ("auth-id", api_key.expose_secret()),
                ("city", request.city.as_str()),
                ("state", request.state.as_str()),
            ],
        )
        .map_err(|e| DomainError {
            kind: DomainErrorKind::Unexpected,
            messages: vec![format!("The zip code provider URL is invalid: {}", endpoint).into()],
            source: e.into(),
        })?;

        let mut outbound = reqwest::Request::new(Method::GET, url);
        let headers = outbound.headers_mut();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Ok(outbound)
    }
}

#[async_trait::async_trait]
impl ZipCodeProvider for HttpZipCodeProvider {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, request: &LookupRequest) -> DomainResult<LookupOutcome> {
        let outbound = self.build_request(request)?;
        let response = self
            .transport
            .send(outbound)
            .await
            .map_err(|e| provider_error("Failed to send a request to the zip code provider", e))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(LookupOutcome::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            provider_error("Failed to read the response from the zip code provider", e)
        })?;
        let results = serde_json::from_slice::<Vec<ProviderResult>>(&body).map_err(|e| {
            provider_error("Failed to parse the response from the zip code provider", e)
        })?;
        Ok(outcome_from_results(results))
    }
}

/// 検索結果を郵便番号検索結果に変換する。
///
/// 入力は1件しか送信しないため、検索結果が1件でない場合は郵便番号を返さない。
fn outcome_from_results(mut results: Vec<ProviderResult>) -> LookupOutcome {
    if results.len() != 1 {
        return LookupOutcome::Ambiguous {
            results: results.len(),
        };
    }
    let ProviderResult {
        status,
        zipcodes,
        reason,
        ..
    } = results.remove(0);
    match zipcodes {
        Some(zipcodes) => {
            LookupOutcome::Found(zipcodes.into_iter().map(|z| ZipCode(z.zipcode)).collect())
        }
        None => LookupOutcome::Unmatched { status, reason },
    }
}

fn provider_error<E>(message: &'static str, e: E) -> DomainError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DomainError {
        kind: DomainErrorKind::Provider,
        messages: vec![message.into()],
        source: e.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::http::StatusCode;
    use reqwest::header::HeaderMap;
    use secrecy::SecretString;

    use super::*;

    const VALID_CITY: &str = "Dallas";
    const VALID_STATE: &str = "TX";
    const INVALID_STATE: &str = "XX";
    const VALID_API_KEY: &str = "1111111";
    const INVALID_API_KEY: &str = "2222222";
    const BASE_URL: &str = "https://us-zipcode.api.smartystreets.com";

    const VALID_INPUT_RESPONSE: &str = r#"[{"input_index":0,"status":"valid_state","zipcodes":[{"zipcode":"11111"},{"zipcode":"22222"}]}]"#;
    const INVALID_STATE_RESPONSE: &str = r#"[{"input_index":0,"status":"invalid_state","reason":"Invalid state name or abbreviation."}]"#;
    const UNAUTHORIZED_RESPONSE: &str = r#"[{"input_index":0,"status":"unauthorized","reason":"Provided credentials are not valid."}]"#;

    /// 送信されたリクエストの内容
    #[derive(Debug, Clone)]
    struct SentRequest {
        method: Method,
        url: Url,
        headers: HeaderMap,
    }

    impl SentRequest {
        fn query(&self, key: &str) -> Option<String> {
            self.url
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        }
    }

    type Responder = fn(&SentRequest) -> (StatusCode, &'static str);

    /// 送信されたリクエストを記録して、`responder`が返すレスポンスを返すトランスポート
    struct FakeTransport {
        responder: Responder,
        sent: Mutex<Vec<SentRequest>>,
    }

    impl FakeTransport {
        fn new(responder: Responder) -> Arc<Self> {
            Arc::new(Self {
                responder,
                sent: Mutex::new(vec![]),
            })
        }

        fn sent(&self) -> Vec<SentRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for FakeTransport {
        async fn send(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let sent = SentRequest {
                method: request.method().clone(),
                url: request.url().clone(),
                headers: request.headers().clone(),
            };
            let (status, body) = (self.responder)(&sent);
            self.sent.lock().unwrap().push(sent);
            let response = axum::http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap();
            Ok(reqwest::Response::from(response))
        }
    }

    /// 認証情報と州に応じて郵便番号プロバイダーのレスポンスを返す。
    fn provider_responder(request: &SentRequest) -> (StatusCode, &'static str) {
        if request.query("auth-id").as_deref() == Some(INVALID_API_KEY) {
            return (StatusCode::UNAUTHORIZED, UNAUTHORIZED_RESPONSE);
        }
        match request.query("state").as_deref() {
            Some(INVALID_STATE) => (StatusCode::OK, INVALID_STATE_RESPONSE),
            _ => (StatusCode::OK, VALID_INPUT_RESPONSE),
        }
    }

    /// 呼び出されるたびに異なるAPIキーを返すAPIキープロバイダー
    struct RotatingApiKey {
        keys: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl ApiKeyProvider for RotatingApiKey {
        fn api_key(&self) -> DomainResult<SecretString> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) % self.keys.len();
            Ok(SecretString::new(self.keys[index].into()))
        }
    }

    fn static_key(key: &str) -> Arc<dyn ApiKeyProvider> {
        Arc::new(StaticApiKey::new(SecretString::new(key.into())))
    }

    fn request(city: &str, state: &str) -> LookupRequest {
        LookupRequest::new(city.into(), state.into()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_input_returns_zip_codes() -> anyhow::Result<()> {
        let transport = FakeTransport::new(provider_responder);
        let provider =
            HttpZipCodeProvider::new(BASE_URL, transport.clone(), static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(
            outcome.into_zip_codes(),
            vec![ZipCode("11111".into()), ZipCode("22222".into())]
        );
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::GET);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_state_returns_empty_list() -> anyhow::Result<()> {
        let transport = FakeTransport::new(provider_responder);
        let provider =
            HttpZipCodeProvider::new(BASE_URL, transport.clone(), static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, INVALID_STATE)).await?;

        assert_eq!(
            outcome,
            LookupOutcome::Unmatched {
                status: Some("invalid_state".into()),
                reason: Some("Invalid state name or abbreviation.".into()),
            }
        );
        assert!(outcome.into_zip_codes().is_empty());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].query("state").as_deref(), Some(INVALID_STATE));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_credentials_returns_empty_list() -> anyhow::Result<()> {
        let transport = FakeTransport::new(provider_responder);
        let provider =
            HttpZipCodeProvider::new(BASE_URL, transport.clone(), static_key(INVALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(outcome, LookupOutcome::Rejected { status: 401 });
        assert!(outcome.into_zip_codes().is_empty());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].query("auth-id").as_deref(), Some(INVALID_API_KEY));
        Ok(())
    }

    #[rstest::rstest]
    #[case(StatusCode::BAD_REQUEST)]
    #[case(StatusCode::PAYMENT_REQUIRED)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(StatusCode::SERVICE_UNAVAILABLE)]
    #[tokio::test]
    async fn test_non_success_status_is_rejected_regardless_of_body(
        #[case] status: StatusCode,
    ) -> anyhow::Result<()> {
        let transport = Arc::new(FixedTransport {
            status,
            body: VALID_INPUT_RESPONSE,
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport, static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(
            outcome,
            LookupOutcome::Rejected {
                status: status.as_u16()
            }
        );
        Ok(())
    }

    /// 常に同じレスポンスを返すトランスポート
    struct FixedTransport {
        status: StatusCode,
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl HttpTransport for FixedTransport {
        async fn send(&self, _: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let response = axum::http::Response::builder()
                .status(self.status)
                .body(self.body.to_string())
                .unwrap();
            Ok(reqwest::Response::from(response))
        }
    }

    #[rstest::rstest]
    #[case("[]", 0)]
    #[case(r#"[{"input_index":0,"zipcodes":[{"zipcode":"11111"}]},{"input_index":1,"zipcodes":[{"zipcode":"22222"}]}]"#, 2)]
    #[tokio::test]
    async fn test_result_count_other_than_one_is_ambiguous(
        #[case] body: &'static str,
        #[case] results: usize,
    ) -> anyhow::Result<()> {
        let transport = Arc::new(FixedTransport {
            status: StatusCode::OK,
            body,
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport, static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(outcome, LookupOutcome::Ambiguous { results });
        Ok(())
    }

    #[rstest::rstest]
    #[case(r#"[{"input_index":0,"status":"valid_state","zipcodes":null}]"#)]
    #[case(r#"[{"input_index":0}]"#)]
    #[tokio::test]
    async fn test_null_or_absent_zip_codes_are_unmatched(
        #[case] body: &'static str,
    ) -> anyhow::Result<()> {
        let transport = Arc::new(FixedTransport {
            status: StatusCode::OK,
            body,
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport, static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert!(matches!(outcome, LookupOutcome::Unmatched { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_zip_code_list_is_found_but_empty() -> anyhow::Result<()> {
        let transport = Arc::new(FixedTransport {
            status: StatusCode::OK,
            body: r#"[{"input_index":0,"status":"valid_state","zipcodes":[]}]"#,
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport, static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(outcome, LookupOutcome::Found(vec![]));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_fields_are_ignored() -> anyhow::Result<()> {
        let transport = Arc::new(FixedTransport {
            status: StatusCode::OK,
            body: r#"[{"input_index":0,"city_states":[{"city":"Dallas","state":"Texas"}],"zipcodes":[{"zipcode":"75201","zipcode_type":"S","latitude":32.78}]}]"#,
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport, static_key(VALID_API_KEY));

        let outcome = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(outcome, LookupOutcome::Found(vec![ZipCode("75201".into())]));
        Ok(())
    }

    #[rstest::rstest]
    #[case("not json")]
    #[case(r#"{"zipcodes":[]}"#)]
    #[case(r#"[{"zipcodes":"11111"}]"#)]
    #[tokio::test]
    async fn test_malformed_response_is_provider_error(#[case] body: &'static str) {
        let transport = Arc::new(FixedTransport {
            status: StatusCode::OK,
            body,
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport, static_key(VALID_API_KEY));

        let result = provider.lookup(&request(VALID_CITY, VALID_STATE)).await;

        match result {
            Err(e) => assert_eq!(e.kind, DomainErrorKind::Provider),
            Ok(outcome) => panic!("Expected DomainErrorKind::Provider, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_provider_error() {
        let transport = Arc::new(reqwest::Client::new());
        let provider =
            HttpZipCodeProvider::new("http://127.0.0.1:1", transport, static_key(VALID_API_KEY));

        let result = provider.lookup(&request(VALID_CITY, VALID_STATE)).await;

        match result {
            Err(e) => assert_eq!(e.kind, DomainErrorKind::Provider),
            Ok(outcome) => panic!("Expected DomainErrorKind::Provider, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_request_carries_key_city_state_and_fixed_headers() -> anyhow::Result<()> {
        let transport = FakeTransport::new(provider_responder);
        let provider = HttpZipCodeProvider::new(
            format!("{}/", BASE_URL),
            transport.clone(),
            static_key(VALID_API_KEY),
        );

        provider
            .lookup(&request("Salt Lake City", "UT & Co"))
            .await?;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let sent = &sent[0];
        assert_eq!(sent.url.scheme(), "https");
        assert_eq!(sent.url.host_str(), Some("us-zipcode.api.smartystreets.com"));
        assert_eq!(sent.url.path(), LOOKUP_PATH);
        assert_eq!(
            sent.url.query(),
            Some("auth-id=1111111&city=Salt+Lake+City&state=UT+%26+Co")
        );
        assert_eq!(sent.query("city").as_deref(), Some("Salt Lake City"));
        assert_eq!(sent.query("state").as_deref(), Some("UT & Co"));
        assert_eq!(sent.headers.get(header::ACCEPT).unwrap(), ACCEPT);
        assert_eq!(sent.headers.get(header::USER_AGENT).unwrap(), USER_AGENT);
        Ok(())
    }

    #[tokio::test]
    async fn test_api_key_is_read_on_every_lookup() -> anyhow::Result<()> {
        let transport = FakeTransport::new(provider_responder);
        let api_key_provider = Arc::new(RotatingApiKey {
            keys: vec![VALID_API_KEY, INVALID_API_KEY],
            calls: AtomicUsize::new(0),
        });
        let provider = HttpZipCodeProvider::new(BASE_URL, transport.clone(), api_key_provider);

        let first = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;
        let second = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(first.into_zip_codes().len(), 2);
        assert_eq!(second, LookupOutcome::Rejected { status: 401 });
        let keys = transport
            .sent()
            .iter()
            .map(|sent| sent.query("auth-id"))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![Some(VALID_API_KEY.into()), Some(INVALID_API_KEY.into())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_lookups_send_one_request_each() -> anyhow::Result<()> {
        let transport = FakeTransport::new(provider_responder);
        let provider =
            HttpZipCodeProvider::new(BASE_URL, transport.clone(), static_key(VALID_API_KEY));

        let first = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;
        let second = provider.lookup(&request(VALID_CITY, VALID_STATE)).await?;

        assert_eq!(first, second);
        assert_eq!(transport.sent().len(), 2);
        Ok(())
    }

    #[test]
    fn test_invalid_base_url_is_unexpected_error() {
        let provider = HttpZipCodeProvider::new(
            "not a url",
            FakeTransport::new(provider_responder),
            static_key(VALID_API_KEY),
        );
        match provider.build_request(&request(VALID_CITY, VALID_STATE)) {
            Err(e) => assert_eq!(e.kind, DomainErrorKind::Unexpected),
            Ok(_) => panic!("Expected DomainErrorKind::Unexpected"),
        }
    }
}
