use super::LoanDate;

/// 返却（貸出の終了）のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseLoanError {
    /// 返却日が貸出日より前
    ReturnedBeforeBorrowed {
        borrowed_on: LoanDate,
        returned_on: LoanDate,
    },
}
