use rust_decimal::Decimal;

use super::Month;

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: Option<i64>,
    pub user_id: i64,
    pub month: Month,
    pub limit_amount: Decimal,
}

impl Budget {
    pub fn new(user_id: i64, month: Month, limit_amount: Decimal) -> Self {
        Self {
            id: None,
            user_id,
            month,
            limit_amount,
        }
    }
}
