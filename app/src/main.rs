use anyhow::Context as _;

use app::{
    bind_address, create_app_state, get_subscriber, init_subscriber, load_app_settings,
    routes::create_router,
};

/// アプリケーション設定ファイルの既定のパス
const DEFAULT_APP_SETTINGS_PATH: &str = "app_settings.toml";

/// アプリケーションエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // アプリケーション設定を読み込み
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_APP_SETTINGS_PATH.to_string());
    let app_settings = load_app_settings(&path)?;

    // トレーシングを初期化
    let subscriber = get_subscriber(
        env!("CARGO_PKG_NAME").into(),
        app_settings.logging.level,
        std::io::stdout,
    );
    init_subscriber(subscriber);

    // ルーターを作成
    let (listener, port) = bind_address(&app_settings.http).await?;
    let app_state = create_app_state(app_settings)?;
    let router = create_router(app_state);

    // HTTPサーバーを起動
    tracing::info!("HTTP server is running on port {}", port);
    axum::serve(listener, router)
        .await
        .context("Failed to start the HTTP server")?;

    Ok(())
}
