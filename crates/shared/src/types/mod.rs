//! Common types used across the application.

pub mod money;
pub mod pagination;
pub mod period;

pub use money::{CENT, MoneyParseError, format_brl, parse_brl, round_cents};
pub use pagination::{PageMeta, PageRequest, PageResponse};
pub use period::{FiscalMonth, FiscalMonthParseError, today_brazil};
