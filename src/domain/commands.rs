use serde::{Deserialize, Serialize};

use super::{InvalidInput, ItemCode, LoanDate, MemberId};

/// コマンド：資料を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowItem {
    pub item_code: ItemCode,
    pub member_id: MemberId,
    pub borrowed_on: LoanDate,
}

impl BorrowItem {
    /// 今日付けの貸出コマンドを作成する
    pub fn new(item_code: ItemCode, member_id: MemberId) -> Self {
        Self {
            item_code,
            member_id,
            borrowed_on: LoanDate::today(),
        }
    }

    /// リクエスト層から渡された生の文字列を検証してコマンドを作成する
    ///
    /// 資料コードを先に検証する。
    pub fn parse(
        item_code: &str,
        member_id: &str,
        borrowed_on: LoanDate,
    ) -> Result<Self, InvalidInput> {
        Ok(Self {
            item_code: ItemCode::parse(item_code)?,
            member_id: MemberId::parse(member_id)?,
            borrowed_on,
        })
    }
}

/// コマンド：資料を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub item_code: ItemCode,
    pub returned_on: LoanDate,
}

impl ReturnItem {
    /// 今日付けの返却コマンドを作成する
    pub fn new(item_code: ItemCode) -> Self {
        Self {
            item_code,
            returned_on: LoanDate::today(),
        }
    }

    pub fn parse(item_code: &str, returned_on: LoanDate) -> Result<Self, InvalidInput> {
        Ok(Self {
            item_code: ItemCode::parse(item_code)?,
            returned_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrow_item_parse_reports_item_code_first() {
        let result = BorrowItem::parse("", "abc", LoanDate::today());
        assert_eq!(result, Err(InvalidInput::EmptyItemCode));
    }

    #[test]
    fn test_borrow_item_parse_rejects_bad_member_id() {
        let result = BorrowItem::parse("B001", "one", LoanDate::today());
        assert_eq!(
            result,
            Err(InvalidInput::MemberIdNotNumeric("one".to_string()))
        );
    }

    #[test]
    fn test_borrow_item_parse_success() {
        let today = LoanDate::today();
        let cmd = BorrowItem::parse("B001", "1", today).unwrap();
        assert_eq!(cmd.item_code.as_str(), "B001");
        assert_eq!(cmd.member_id.value(), 1);
        assert_eq!(cmd.borrowed_on, today);
    }

    #[test]
    fn test_return_item_parse_rejects_empty_code() {
        assert_eq!(
            ReturnItem::parse("", LoanDate::today()),
            Err(InvalidInput::EmptyItemCode)
        );
    }
}
