//! This module provides the test case for the integration tests
//!
//! A test case spawns the fake zip code provider and the application server,
//! which is configured to send its lookups to the fake provider.
use std::{net::TcpListener as StdTcpListener, sync::Arc, sync::Once, time::Duration};

use app::{create_app_state, get_subscriber, init_subscriber, routes::create_router};
use infra::AppState;
use settings::AppSettings;

use crate::helpers::{FakeProviderState, SpawnedServer, spawn_fake_provider, spawn_server};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static TRACING: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableTracing {
    Yes,
    No,
}

/// Test case for integration tests
///
/// ```
/// #[tokio::test]
/// async fn integration_test_case_skeleton() {
///     // Initialize the test case
///     let app_settings = load_app_settings_for_testing();
///     let test_case = TestCase::begin(app_settings, EnableTracing::No).await;
///
///     /************************************************************
///
///             Implement integration test logic here
///
///     *************************************************************/
///
///     // Terminate the test case gracefully
///     test_case.end().await;
/// }
/// ```
pub struct TestCase {
    pub app_state: AppState,
    app: SpawnedServer,
    provider: SpawnedServer,
    pub provider_state: Arc<FakeProviderState>,
    pub http_client: reqwest::Client,
}

impl TestCase {
    pub async fn begin(mut app_settings: AppSettings, tracing: EnableTracing) -> Self {
        if tracing == EnableTracing::Yes {
            TRACING.call_once(|| {
                let subscriber = get_subscriber(
                    "test_suite".into(),
                    app_settings.logging.level,
                    std::io::stdout,
                );
                init_subscriber(subscriber);
            });
        }

        // Spawn the fake provider, and send the lookups of the application to it
        let (provider, provider_state) = spawn_fake_provider();
        app_settings.provider.base_url = provider.origin();

        // Specify a random port for the HTTP server to bind
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        app_settings.http.host = String::from("127.0.0.1");
        app_settings.http.port = listener.local_addr().unwrap().port();

        let app_state = create_app_state(app_settings).unwrap();
        let app = spawn_server(listener, create_router(app_state.clone()));

        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap();
        Self {
            app_state,
            app,
            provider,
            provider_state,
            http_client,
        }
    }

    pub async fn end(self) {
        self.app.shutdown();
        self.provider.shutdown();
    }

    pub fn origin(&self) -> String {
        format!(
            "{}://{}:{}",
            self.app_state.app_settings.http.protocol,
            self.app_state.app_settings.http.host,
            self.app_state.app_settings.http.port,
        )
    }

    /// Returns the number of lookups the fake provider received
    pub fn provider_hits(&self) -> usize {
        self.provider_state.hits()
    }

    pub async fn health_check(&self) -> reqwest::Response {
        let uri = format!("{}/health-check", self.origin());
        self.http_client.get(&uri).send().await.unwrap()
    }

    /// Requests the zip codes, leaving out the query parameters that are `None`
    pub async fn zip_codes(&self, city: Option<&str>, state: Option<&str>) -> reqwest::Response {
        let uri = format!("{}/zipcode", self.origin());
        let mut query = vec![];
        if let Some(city) = city {
            query.push(("city", city));
        }
        if let Some(state) = state {
            query.push(("state", state));
        }
        self.http_client
            .get(&uri)
            .query(&query)
            .send()
            .await
            .unwrap()
    }
}
