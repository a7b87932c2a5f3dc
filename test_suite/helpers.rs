//! This module sets up the servers used by the integration tests
//!
//! The integration test does not call the real zip code provider.
//! Instead, it spawns a fake provider that answers the same way as the real one,
//! and points the application at it through `provider.base_url`.
//!
//! Both servers bind to a random port and run in their own thread,
//! so that each test case owns its servers and can shut them down gracefully.
use std::{
    collections::HashMap,
    net::TcpListener as StdTcpListener,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread::JoinHandle,
};

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse as _, Response},
    routing::get,
};
use secrecy::SecretString;
use tokio::{net::TcpListener, sync::oneshot};

use app::load_app_settings;
use settings::AppSettings;

pub const VALID_CITY: &str = "Dallas";
pub const VALID_STATE: &str = "TX";
pub const INVALID_STATE: &str = "XX";
pub const VALID_API_KEY: &str = "1111111";
pub const INVALID_API_KEY: &str = "2222222";
/// The fake provider answers this city with a body that is not JSON
pub const MALFORMED_CITY: &str = "Malformed";
/// The fake provider answers this city with two results
pub const AMBIGUOUS_CITY: &str = "Springfield";

const VALID_INPUT_RESPONSE: &str = r#"[{"input_index":0,"status":"valid_state","zipcodes":[{"zipcode":"11111"},{"zipcode":"22222"}]}]"#;
const INVALID_STATE_RESPONSE: &str = r#"[{"input_index":0,"status":"invalid_state","reason":"Invalid state name or abbreviation."}]"#;
const UNAUTHORIZED_RESPONSE: &str = r#"[{"input_index":0,"status":"unauthorized","reason":"Provided credentials are not valid."}]"#;
const AMBIGUOUS_RESPONSE: &str = r#"[{"input_index":0,"zipcodes":[{"zipcode":"11111"}]},{"input_index":1,"zipcodes":[{"zipcode":"22222"}]}]"#;

/// Loads the application settings for testing
///
/// The provider API key is replaced with `VALID_API_KEY`.
pub fn load_app_settings_for_testing() -> AppSettings {
    let dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set");
    let path = Path::new(&dir).join("..").join("app_settings.toml");
    let mut app_settings = load_app_settings(path.as_os_str().to_str().unwrap()).unwrap();
    app_settings.provider.api_key = SecretString::new(VALID_API_KEY.into());
    app_settings
}

/// A request received by the fake provider
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
}

#[derive(Default)]
pub struct FakeProviderState {
    hits: AtomicUsize,
    received: Mutex<Vec<ReceivedRequest>>,
}

impl FakeProviderState {
    /// Returns the number of requests the fake provider received
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Returns the requests the fake provider received
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

/// Answers a zip code lookup the way the real provider does
async fn fake_lookup(
    State(state): State<Arc<FakeProviderState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.received.lock().unwrap().push(ReceivedRequest {
        query: query.clone(),
        headers,
    });

    let param = |key: &str| query.get(key).map(String::as_str);
    if param("auth-id") != Some(VALID_API_KEY) {
        return (StatusCode::UNAUTHORIZED, UNAUTHORIZED_RESPONSE).into_response();
    }
    match (param("city"), param("state")) {
        (Some(MALFORMED_CITY), _) => (StatusCode::OK, "<html>Service Unavailable</html>"),
        (Some(AMBIGUOUS_CITY), _) => (StatusCode::OK, AMBIGUOUS_RESPONSE),
        (_, Some(INVALID_STATE)) => (StatusCode::OK, INVALID_STATE_RESPONSE),
        _ => (StatusCode::OK, VALID_INPUT_RESPONSE),
    }
    .into_response()
}

pub struct SpawnedServer {
    pub port: u16,
    pub handle: JoinHandle<()>,
    pub shutdown_signal: oneshot::Sender<()>,
}

impl SpawnedServer {
    pub fn origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Sends the graceful shutdown signal and waits for the server to stop
    pub fn shutdown(self) {
        self.shutdown_signal.send(()).unwrap();
        self.handle.join().unwrap();
    }
}

/// Spawns the fake provider on a random port
pub fn spawn_fake_provider() -> (SpawnedServer, Arc<FakeProviderState>) {
    let state = Arc::new(FakeProviderState::default());
    let router = Router::new()
        .route("/lookup", get(fake_lookup))
        .with_state(state.clone());
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    (spawn_server(listener, router), state)
}

/// Spawns a server in a separate thread
///
/// The listener is converted to a tokio listener inside the thread's own runtime.
pub fn spawn_server(listener: StdTcpListener, router: Router) -> SpawnedServer {
    listener.set_nonblocking(true).unwrap();
    let port = listener.local_addr().unwrap().port();
    let (shutdown_signal, close_rx) = oneshot::channel();
    let handle = std::thread::spawn(move || run_server(listener, router, close_rx));
    SpawnedServer {
        port,
        handle,
        shutdown_signal,
    }
}

/// Runs a server with graceful shutdown support
fn run_server(listener: StdTcpListener, router: Router, close_rx: oneshot::Receiver<()>) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async move {
        let listener = TcpListener::from_std(listener).unwrap();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                _ = close_rx.await;
            })
            .await
            .unwrap();
    });
}

pub struct ResponseParts {
    /// ステータスコード
    pub status_code: reqwest::StatusCode,
    /// ヘッダ
    pub headers: reqwest::header::HeaderMap,
    /// ボディ
    pub body: String,
}

pub async fn split_response(response: reqwest::Response) -> ResponseParts {
    ResponseParts {
        status_code: response.status(),
        headers: response.headers().clone(),
        body: response.text().await.unwrap().to_string(),
    }
}
