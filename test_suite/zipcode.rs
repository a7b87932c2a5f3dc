use reqwest::{StatusCode, header::CACHE_CONTROL};
use secrecy::SecretString;

use crate::helpers::{
    AMBIGUOUS_CITY, INVALID_API_KEY, INVALID_STATE, MALFORMED_CITY, ResponseParts, VALID_API_KEY,
    VALID_CITY, VALID_STATE, load_app_settings_for_testing, split_response,
};
use crate::test_case::{EnableTracing, TestCase};

fn zip_codes_from(body: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(body).unwrap()
}

#[tokio::test]
async fn valid_city_and_state_return_zip_codes() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case
        .zip_codes(Some(VALID_CITY), Some(VALID_STATE))
        .await;
    let ResponseParts {
        status_code,
        headers,
        body,
    } = split_response(response).await;
    assert_eq!(
        status_code,
        StatusCode::OK,
        "Zip code request failed: {}",
        status_code
    );
    assert_eq!(zip_codes_from(&body), vec!["11111", "22222"]);
    assert_eq!(
        headers.get(CACHE_CONTROL).unwrap(),
        "public, max-age=86400",
        "Zip code responses must be cacheable for 24 hours"
    );
    assert_eq!(test_case.provider_hits(), 1);

    test_case.end().await;
}

#[tokio::test]
async fn lookup_sends_api_key_city_and_state_to_provider() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case
        .zip_codes(Some("Salt Lake City"), Some(VALID_STATE))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let received = test_case.provider_state.received();
    assert_eq!(received.len(), 1, "Expected exactly one provider request");
    let query = &received[0].query;
    assert_eq!(query.get("auth-id").map(String::as_str), Some(VALID_API_KEY));
    assert_eq!(query.get("city").map(String::as_str), Some("Salt Lake City"));
    assert_eq!(query.get("state").map(String::as_str), Some(VALID_STATE));
    let headers = &received[0].headers;
    assert_eq!(
        headers.get("accept").unwrap(),
        "application/vnd.github.v3+json"
    );
    assert_eq!(headers.get("user-agent").unwrap(), "zipcode-finder");

    test_case.end().await;
}

#[tokio::test]
async fn missing_city_or_state_returns_empty_list_without_calling_provider() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let inputs = [
        (None, Some(VALID_STATE)),
        (Some(VALID_CITY), None),
        (None, None),
        (Some(""), Some(VALID_STATE)),
        (Some(VALID_CITY), Some("")),
    ];
    for (city, state) in inputs {
        let response = test_case.zip_codes(city, state).await;
        let ResponseParts {
            status_code, body, ..
        } = split_response(response).await;
        assert_eq!(
            status_code,
            StatusCode::OK,
            "city={:?}, state={:?}",
            city,
            state
        );
        assert!(
            zip_codes_from(&body).is_empty(),
            "city={:?}, state={:?}, body={}",
            city,
            state,
            body
        );
    }
    assert_eq!(
        test_case.provider_hits(),
        0,
        "The provider must not be called when city or state is missing"
    );

    test_case.end().await;
}

#[tokio::test]
async fn invalid_state_returns_empty_list() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case
        .zip_codes(Some(VALID_CITY), Some(INVALID_STATE))
        .await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK);
    assert!(zip_codes_from(&body).is_empty(), "body={}", body);
    assert_eq!(test_case.provider_hits(), 1);

    test_case.end().await;
}

#[tokio::test]
async fn invalid_credentials_return_empty_list() {
    let mut app_settings = load_app_settings_for_testing();
    app_settings.provider.api_key = SecretString::new(INVALID_API_KEY.into());
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case
        .zip_codes(Some(VALID_CITY), Some(VALID_STATE))
        .await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK);
    assert!(zip_codes_from(&body).is_empty(), "body={}", body);
    let received = test_case.provider_state.received();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].query.get("auth-id").map(String::as_str),
        Some(INVALID_API_KEY)
    );

    test_case.end().await;
}

#[tokio::test]
async fn ambiguous_results_return_empty_list() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let response = test_case
        .zip_codes(Some(AMBIGUOUS_CITY), Some(VALID_STATE))
        .await;
    let ResponseParts {
        status_code, body, ..
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::OK);
    assert!(zip_codes_from(&body).is_empty(), "body={}", body);

    test_case.end().await;
}

#[tokio::test]
async fn malformed_provider_response_returns_bad_gateway() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::Yes).await;

    let response = test_case
        .zip_codes(Some(MALFORMED_CITY), Some(VALID_STATE))
        .await;
    let ResponseParts {
        status_code,
        headers,
        body,
    } = split_response(response).await;
    assert_eq!(status_code, StatusCode::BAD_GATEWAY);
    assert!(
        headers.get(CACHE_CONTROL).is_none(),
        "Error responses must not be cached"
    );
    let body = serde_json::from_str::<serde_json::Value>(&body).unwrap();
    assert!(body["messages"].is_array(), "body={}", body);

    test_case.end().await;
}

#[tokio::test]
async fn repeated_lookups_return_identical_zip_codes() {
    let app_settings = load_app_settings_for_testing();
    let test_case = TestCase::begin(app_settings, EnableTracing::No).await;

    let first = split_response(
        test_case
            .zip_codes(Some(VALID_CITY), Some(VALID_STATE))
            .await,
    )
    .await;
    let second = split_response(
        test_case
            .zip_codes(Some(VALID_CITY), Some(VALID_STATE))
            .await,
    )
    .await;
    assert_eq!(first.body, second.body);
    assert_eq!(
        test_case.provider_hits(),
        2,
        "Each inbound request must send exactly one provider request"
    );

    test_case.end().await;
}
