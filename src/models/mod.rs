mod budget;
mod category;
mod month;
mod period;
mod transaction;
mod user;

pub use budget::Budget;
pub use category::{Category, INCOME_CATEGORIES};
pub use month::Month;
pub use period::{DateRange, TransactionFilter};
pub use transaction::{Transaction, TransactionType, MAX_AMOUNT};
pub use user::User;
