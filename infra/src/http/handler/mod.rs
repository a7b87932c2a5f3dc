pub mod zipcode;

use use_case::zipcode::ZipCodeUseCase;

use crate::{AppState, provider::HttpZipCodeProvider};

/// ヘルスチェックハンドラ
#[tracing::instrument()]
pub async fn health_check() -> &'static str {
    "Ok, the server is running!"
}

type ZipCodeUseCaseImpl = ZipCodeUseCase<HttpZipCodeProvider>;

fn zip_code_use_case(app_state: &AppState) -> ZipCodeUseCaseImpl {
    let provider = HttpZipCodeProvider::new(
        app_state.app_settings.provider.base_url.clone(),
        app_state.transport.clone(),
        app_state.api_key_provider.clone(),
    );
    ZipCodeUseCase::new(provider)
}
