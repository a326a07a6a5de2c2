use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 入力値の不正
///
/// 入力境界で識別子を値オブジェクトに変換できなかった理由。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    /// 資料コードが空
    EmptyItemCode,
    /// 資料コードに制御文字が含まれる
    ItemCodeHasControlChar,
    /// 会員IDが空
    EmptyMemberId,
    /// 会員IDが数値として解釈できない
    MemberIdNotNumeric(String),
    /// 返却日が貸出日より前
    ReturnBeforeBorrow {
        borrowed_on: LoanDate,
        returned_on: LoanDate,
    },
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInput::EmptyItemCode => write!(f, "item code is empty"),
            InvalidInput::ItemCodeHasControlChar => {
                write!(f, "item code contains control characters")
            }
            InvalidInput::EmptyMemberId => write!(f, "member id is empty"),
            InvalidInput::MemberIdNotNumeric(raw) => {
                write!(f, "member id must be a number, got {:?}", raw)
            }
            InvalidInput::ReturnBeforeBorrow {
                borrowed_on,
                returned_on,
            } => write!(
                f,
                "return date {} is before borrow date {}",
                returned_on, borrowed_on
            ),
        }
    }
}

impl std::error::Error for InvalidInput {}

/// 貸出ID - 貸出記録の永続化上の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

/// 資料コード - カタログ管理コンテキストへの参照
///
/// 不変条件：空でなく、制御文字を含まない。入力された文字列をそのまま保持し、
/// 空白の除去などの正規化は行わない（存在確認はカタログに任せる）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemCode(String);

impl ItemCode {
    /// 生の文字列から資料コードを作成する
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        if raw.is_empty() {
            return Err(InvalidInput::EmptyItemCode);
        }
        if raw.chars().any(char::is_control) {
            return Err(InvalidInput::ItemCodeHasControlChar);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemCode {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemCode> for String {
    fn from(code: ItemCode) -> Self {
        code.0
    }
}

/// 会員ID - 会員管理コンテキストへの参照
///
/// 整数として解釈できれば形式上は正しい。0 や負数も受け付け、
/// 実在するかどうかは会員ディレクトリで判定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct MemberId(i32);

impl MemberId {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// フォーム入力などの文字列から会員IDを作成する
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        if raw.is_empty() {
            return Err(InvalidInput::EmptyMemberId);
        }
        raw.parse()
            .map(Self)
            .map_err(|_| InvalidInput::MemberIdNotNumeric(raw.to_string()))
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for MemberId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<MemberId> for i32 {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

/// 貸出日・返却日（暦日）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanDate(NaiveDate);

impl LoanDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// ローカルタイムゾーンでの今日
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn value(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for LoanDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NaiveDate> for LoanDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}
