pub mod routes;

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use config::{Config, Environment};
use tokio::net::TcpListener;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt as _};

use infra::{
    AppState,
    provider::{HttpTransport, StaticApiKey},
};
use settings::{AppSettings, HttpSettings, ProviderSettings};

/// 環境変数でアプリケーション設定を上書きするときの接頭辞
///
/// 例えば、`APP__PROVIDER__API_KEY`でAPIキーを設定できる。
pub const ENV_PREFIX: &str = "APP";

pub fn load_app_settings(path: &str) -> anyhow::Result<AppSettings> {
    load_app_settings_with_env(path, Environment::with_prefix(ENV_PREFIX).separator("__"))
}

/// ファイルの設定を`environment`で上書きしたアプリケーション設定を返す。
fn load_app_settings_with_env(path: &str, environment: Environment) -> anyhow::Result<AppSettings> {
    let config = Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(environment)
        .build()
        .context("Failed to read the app_settings.toml file")?;
    config
        .try_deserialize()
        .context("The contents of the app_settings.toml file is incorrect")
}

pub async fn bind_address(settings: &HttpSettings) -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(settings.bind_address())
        .await
        .context("Failed to bind to the address for the HTTP server")?;
    let port = listener
        .local_addr()
        .context("Failed to get the port of listener")?
        .port();

    Ok((listener, port))
}

/// 郵便番号プロバイダーと通信するHTTPクライアントを作成する。
///
/// HTTPクライアントはコネクションをプールするため、アプリケーション全体で共有する。
pub fn create_http_client(settings: &ProviderSettings) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout))
        .build()
        .context("Failed to create the HTTP client for the zip code provider")
}

pub fn create_app_state(app_settings: AppSettings) -> anyhow::Result<AppState> {
    let transport: Arc<dyn HttpTransport> = Arc::new(create_http_client(&app_settings.provider)?);
    let api_key_provider = Arc::new(StaticApiKey::from(&app_settings.provider));
    Ok(AppState {
        app_settings,
        transport,
        api_key_provider,
    })
}

pub fn get_subscriber<Sink>(
    name: String,
    log_level: log::Level,
    sink: Sink,
) -> impl Subscriber + Sync + Send
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}
