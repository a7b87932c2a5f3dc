use std::borrow::Cow;

pub mod models;
pub mod providers;

/// ドメインエラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, enum_display::EnumDisplay)]
pub enum DomainErrorKind {
    /// 検証エラー
    Validation,
    /// 郵便番号プロバイダーとの通信、またはレスポンスの解析に失敗
    Provider,
    /// 予期しないエラー
    Unexpected,
}

/// ドメインエラー
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {}", .messages.join(", "))]
pub struct DomainError {
    /// エラーの種類
    pub kind: DomainErrorKind,
    /// エラーメッセージ
    pub messages: Vec<Cow<'static, str>>,
    /// 原因となったエラー
    #[source]
    pub source: anyhow::Error,
}

/// ドメイン結果
pub type DomainResult<T> = Result<T, DomainError>;

/// 原因となるエラーを持たないドメインエラーを作成する。
pub fn domain_error(kind: DomainErrorKind, message: &'static str) -> DomainError {
    DomainError {
        kind,
        messages: vec![message.into()],
        source: anyhow::anyhow!(message),
    }
}
