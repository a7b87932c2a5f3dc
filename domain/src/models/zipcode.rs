use garde::Validate as _;
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainErrorKind, DomainResult};

/// 郵便番号
///
/// プロバイダーが返した文字列をそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZipCode(pub String);

impl std::fmt::Display for ZipCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ZipCode> for String {
    fn from(value: ZipCode) -> Self {
        value.0
    }
}

/// 郵便番号検索要求
///
/// 市と州は空文字列でないことのみを検証する。
/// 前後の空白の除去や、州の略称の検証は行わず、与えられた値をそのまま使用する。
#[derive(Debug, Clone, PartialEq, Eq, garde::Validate)]
pub struct LookupRequest {
    /// 市
    #[garde(length(chars, min = 1))]
    pub city: String,
    /// 州
    #[garde(length(chars, min = 1))]
    pub state: String,
}

impl LookupRequest {
    pub fn new(city: String, state: String) -> DomainResult<Self> {
        let request = Self { city, state };
        match request.validate() {
            Ok(_) => Ok(request),
            Err(e) => Err(DomainError {
                kind: DomainErrorKind::Validation,
                messages: vec![e.to_string().into()],
                source: e.into(),
            }),
        }
    }
}

/// 郵便番号検索結果
///
/// プロバイダーが郵便番号を返さなかった場合は、その理由を保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// 郵便番号が見つかった
    Found(Vec<ZipCode>),
    /// プロバイダーが成功以外のHTTPステータスコードを返した
    Rejected {
        /// HTTPステータスコード
        status: u16,
    },
    /// 検索結果に郵便番号リストが含まれていなかった
    Unmatched {
        /// プロバイダーが返した状態（例: `invalid_state`）
        status: Option<String>,
        /// プロバイダーが返した理由
        reason: Option<String>,
    },
    /// 検索結果の数が1件でなかった
    Ambiguous {
        /// 検索結果の数
        results: usize,
    },
}

impl LookupOutcome {
    /// 郵便番号リストに変換する。
    ///
    /// `Found`以外は空のリストになる。
    pub fn into_zip_codes(self) -> Vec<ZipCode> {
        match self {
            Self::Found(zip_codes) => zip_codes,
            _ => vec![],
        }
    }
}
