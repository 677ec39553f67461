//! Closed-month posting guard.

use chrono::NaiveDate;
use contta_shared::types::FiscalMonth;

use crate::closing::ClosingStatus;
use crate::ledger::error::LedgerError;

/// Rejects postings into a month whose closing status is `closed`.
///
/// `status` is `None` when the month has no closing record yet.
pub fn ensure_period_open(
    period: FiscalMonth,
    status: Option<ClosingStatus>,
) -> Result<(), LedgerError> {
    match status {
        Some(status) if !status.accepts_postings() => Err(LedgerError::PeriodClosed(period)),
        _ => Ok(()),
    }
}

/// Same as [`ensure_period_open`] for the month containing `date`.
pub fn ensure_date_open(date: NaiveDate, status: Option<ClosingStatus>) -> Result<(), LedgerError> {
    ensure_period_open(FiscalMonth::of(date), status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = Option<ClosingStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(ClosingStatus::Open)),
            Just(Some(ClosingStatus::Blocked)),
            Just(Some(ClosingStatus::Authorized)),
            Just(Some(ClosingStatus::Closed)),
            Just(Some(ClosingStatus::Reopened)),
        ]
    }

    proptest! {
        /// Only closed months reject postings.
        #[test]
        fn prop_only_closed_rejects(status in status_strategy(), month in 1u32..=12) {
            let period = FiscalMonth::new(2025, month).unwrap();
            let result = ensure_period_open(period, status);
            if status == Some(ClosingStatus::Closed) {
                prop_assert_eq!(result, Err(LedgerError::PeriodClosed(period)));
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn test_date_maps_to_month() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let err = ensure_date_open(date, Some(ClosingStatus::Closed)).unwrap_err();
        assert_eq!(err.to_string(), "Period 2025-03 is closed, no posting allowed");
    }
}
