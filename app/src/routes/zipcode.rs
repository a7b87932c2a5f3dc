use axum::{Router, middleware, routing::get};

use infra::{
    AppState,
    http::{handler::zipcode::list, middleware::cache_control_middleware},
};

pub fn create_zip_code_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .layer(middleware::from_fn_with_state(
            app_state.app_settings.cache,
            cache_control_middleware,
        ))
        .with_state(app_state)
}
