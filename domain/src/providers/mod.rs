use crate::{
    DomainResult,
    models::{LookupOutcome, LookupRequest},
};

/// 郵便番号プロバイダー
///
/// 市と州の組み合わせから、その地域に割り当てられた郵便番号を検索する。
/// 具象プロバイダーはインフラストラクチャー層で実装して、ユースケースにDIする。
#[async_trait::async_trait]
pub trait ZipCodeProvider: Send + Sync {
    /// 郵便番号を検索する。
    ///
    /// プロバイダーが要求を拒否した場合や、検索結果の形式が期待と異なる場合は、
    /// エラーではなく、その理由を表現した`LookupOutcome`を返す。
    /// プロバイダーと通信できなかった場合、またはレスポンスを解析できなかった場合はエラーを返す。
    async fn lookup(&self, request: &LookupRequest) -> DomainResult<LookupOutcome>;
}
