mod helpers;
mod test_case;
mod zipcode;

use crate::{
    helpers::load_app_settings_for_testing,
    test_case::{EnableTracing, TestCase},
};

#[tokio::test]
async fn health_check() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case.health_check().await;
    assert!(
        response.status().is_success(),
        "Health check failed: {}",
        response.status()
    );
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Ok, the server is running!"),
        "Health check response did not contain 'Ok, the server is running!'"
    );

    test_case.end().await;
}
