use domain::{
    DomainResult,
    models::{LookupOutcome, LookupRequest, ZipCode},
    providers::ZipCodeProvider,
};

pub struct ZipCodeUseCase<P>
where
    P: ZipCodeProvider,
{
    pub provider: P,
}

impl<P> ZipCodeUseCase<P>
where
    P: ZipCodeProvider,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// 市と州に割り当てられた郵便番号を返す。
    ///
    /// 市または州が指定されていない、または空文字列の場合は、プロバイダーに問い合わせず空のリストを返す。
    /// プロバイダーが郵便番号を返さなかった場合も空のリストを返す。
    pub async fn lookup(
        &self,
        city: Option<String>,
        state: Option<String>,
    ) -> DomainResult<Vec<ZipCode>> {
        let (Some(city), Some(state)) = (city, state) else {
            tracing::debug!("city or state is missing");
            return Ok(vec![]);
        };
        let request = match LookupRequest::new(city, state) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("lookup request is invalid: {}", e);
                return Ok(vec![]);
            }
        };

        let outcome = self.provider.lookup(&request).await?;
        match &outcome {
            LookupOutcome::Found(zip_codes) => {
                tracing::debug!("{} zip codes found", zip_codes.len());
            }
            LookupOutcome::Rejected { status } => {
                tracing::warn!("the provider rejected the lookup with status {}", status);
            }
            LookupOutcome::Unmatched { status, reason } => {
                tracing::info!(
                    "no zip codes matched: status={:?}, reason={:?}",
                    status,
                    reason
                );
            }
            LookupOutcome::Ambiguous { results } => {
                tracing::info!("the provider returned {} results instead of one", results);
            }
        }
        Ok(outcome.into_zip_codes())
    }
}
