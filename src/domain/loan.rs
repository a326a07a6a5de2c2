use serde::{Deserialize, Serialize};

use super::{CloseLoanError, ItemCode, LoanDate, LoanId, MemberId};

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// 貸出中（未返却）の貸出
///
/// returned_on を持たないことを型で表現する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLoan {
    pub loan_id: LoanId,
    pub item_code: ItemCode,
    pub member_id: MemberId,
    pub borrowed_on: LoanDate,
}

/// 返却済みの貸出
///
/// 不変条件：borrowed_on <= returned_on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedLoan {
    #[serde(flatten)]
    pub loan: OpenLoan,
    pub returned_on: LoanDate,
}

impl std::ops::Deref for ClosedLoan {
    type Target = OpenLoan;

    fn deref(&self) -> &Self::Target {
        &self.loan
    }
}

/// 貸出記録
///
/// 貸出は一度だけ Open から Closed に遷移し、削除・再オープンされない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Loan {
    Open(OpenLoan),
    Closed(ClosedLoan),
}

impl Loan {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Loan::Open(open) => open.loan_id,
            Loan::Closed(closed) => closed.loan_id,
        }
    }

    pub fn item_code(&self) -> &ItemCode {
        match self {
            Loan::Open(open) => &open.item_code,
            Loan::Closed(closed) => &closed.item_code,
        }
    }

    pub fn member_id(&self) -> MemberId {
        match self {
            Loan::Open(open) => open.member_id,
            Loan::Closed(closed) => closed.member_id,
        }
    }

    pub fn borrowed_on(&self) -> LoanDate {
        match self {
            Loan::Open(open) => open.borrowed_on,
            Loan::Closed(closed) => closed.borrowed_on,
        }
    }

    pub fn returned_on(&self) -> Option<LoanDate> {
        match self {
            Loan::Open(_) => None,
            Loan::Closed(closed) => Some(closed.returned_on),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Loan::Open(_))
    }

    /// 永続化された列の値から貸出を復元する
    ///
    /// returned_on が borrowed_on より前の行は不変条件違反として拒否する。
    pub fn from_parts(
        loan_id: LoanId,
        item_code: ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
        returned_on: Option<LoanDate>,
    ) -> Result<Self, CloseLoanError> {
        let open = OpenLoan {
            loan_id,
            item_code,
            member_id,
            borrowed_on,
        };
        match returned_on {
            None => Ok(Loan::Open(open)),
            Some(returned_on) => close_loan(open, returned_on).map(Loan::Closed),
        }
    }
}

impl From<OpenLoan> for Loan {
    fn from(loan: OpenLoan) -> Self {
        Loan::Open(loan)
    }
}

impl From<ClosedLoan> for Loan {
    fn from(loan: ClosedLoan) -> Self {
        Loan::Closed(loan)
    }
}

/// 資料の貸出可否（保存されない派生ビュー）
///
/// Available --[貸出]--> OnLoan --[返却]--> Available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAvailability {
    Available,
    OnLoan(OpenLoan),
}

impl ItemAvailability {
    /// 資料の現在の貸出中レコードから状態を導出する
    pub fn from_open_loan(open_loan: Option<OpenLoan>) -> Self {
        match open_loan {
            Some(loan) => ItemAvailability::OnLoan(loan),
            None => ItemAvailability::Available,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ItemAvailability::Available)
    }
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：貸出を開始する
///
/// 副作用なし。新しい OpenLoan を返す。
/// 同一資料の重複貸出の検査は永続化層のトランザクションで行う。
pub fn open_loan(item_code: ItemCode, member_id: MemberId, borrowed_on: LoanDate) -> OpenLoan {
    OpenLoan {
        loan_id: LoanId::new(),
        item_code,
        member_id,
        borrowed_on,
    }
}

/// 純粋関数：貸出を終了する
///
/// ビジネスルール：
/// - 返却日は貸出日以降
/// - OpenLoan のみ受け付ける（二重返却は型で排除）
pub fn close_loan(loan: OpenLoan, returned_on: LoanDate) -> Result<ClosedLoan, CloseLoanError> {
    if returned_on < loan.borrowed_on {
        return Err(CloseLoanError::ReturnedBeforeBorrowed {
            borrowed_on: loan.borrowed_on,
            returned_on,
        });
    }

    Ok(ClosedLoan { loan, returned_on })
}
