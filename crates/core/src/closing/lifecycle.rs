//! Status transitions of a month: evaluate, sign off, reopen.

use contta_shared::types::FiscalMonth;

use super::error::ClosingError;
use super::types::{ClosingDecision, ClosingStatus};

/// A month may be (re)evaluated unless it is closed.
pub fn ensure_can_evaluate(
    period: FiscalMonth,
    current: Option<ClosingStatus>,
) -> Result<(), ClosingError> {
    match current {
        Some(ClosingStatus::Closed) => Err(ClosingError::AlreadyClosed(period)),
        _ => Ok(()),
    }
}

/// State stored by the last evaluation.
#[derive(Debug, Clone, Copy)]
pub struct StoredEvaluation<'a> {
    /// Current status.
    pub status: ClosingStatus,
    /// Decision of the last evaluation, if any.
    pub decision: Option<ClosingDecision>,
    /// Hash of the input the decision was made on.
    pub input_hash: Option<&'a str>,
}

/// Checks a sign-off request against the stored evaluation and the hash of
/// freshly gathered input.
pub fn ensure_can_sign_off(
    period: FiscalMonth,
    stored: Option<StoredEvaluation<'_>>,
    fresh_hash: &str,
) -> Result<(), ClosingError> {
    let Some(stored) = stored else {
        return Err(ClosingError::NotEvaluated(period));
    };

    if stored.status == ClosingStatus::Closed {
        return Err(ClosingError::AlreadyClosed(period));
    }

    let (Some(decision), Some(hash)) = (stored.decision, stored.input_hash) else {
        return Err(ClosingError::NotEvaluated(period));
    };

    if decision != ClosingDecision::Authorized {
        return Err(ClosingError::Blocked(period));
    }

    // Reopened months keep their old decision until evaluated again.
    if stored.status != ClosingStatus::Authorized {
        return Err(ClosingError::NotEvaluated(period));
    }

    if hash != fresh_hash {
        return Err(ClosingError::StaleEvaluation(period));
    }

    Ok(())
}

/// Only closed months can be reopened.
pub fn ensure_can_reopen(
    period: FiscalMonth,
    current: Option<ClosingStatus>,
) -> Result<(), ClosingError> {
    match current {
        Some(ClosingStatus::Closed) => Ok(()),
        Some(status) => Err(ClosingError::NotClosed { period, status }),
        None => Err(ClosingError::NotClosed {
            period,
            status: ClosingStatus::Open,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn month() -> FiscalMonth {
        "2025-01".parse().unwrap()
    }

    fn stored(status: ClosingStatus, decision: ClosingDecision, hash: &str) -> StoredEvaluation<'_> {
        StoredEvaluation {
            status,
            decision: Some(decision),
            input_hash: Some(hash),
        }
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(ClosingStatus::Open), true)]
    #[case(Some(ClosingStatus::Blocked), true)]
    #[case(Some(ClosingStatus::Authorized), true)]
    #[case(Some(ClosingStatus::Reopened), true)]
    #[case(Some(ClosingStatus::Closed), false)]
    fn test_can_evaluate(#[case] status: Option<ClosingStatus>, #[case] allowed: bool) {
        assert_eq!(ensure_can_evaluate(month(), status).is_ok(), allowed);
    }

    #[test]
    fn test_sign_off_happy_path() {
        let result = ensure_can_sign_off(
            month(),
            Some(stored(ClosingStatus::Authorized, ClosingDecision::Authorized, "abc")),
            "abc",
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_sign_off_rejections() {
        assert_eq!(
            ensure_can_sign_off(month(), None, "abc"),
            Err(ClosingError::NotEvaluated(month()))
        );
        assert_eq!(
            ensure_can_sign_off(
                month(),
                Some(stored(ClosingStatus::Blocked, ClosingDecision::Blocked, "abc")),
                "abc"
            ),
            Err(ClosingError::Blocked(month()))
        );
        assert_eq!(
            ensure_can_sign_off(
                month(),
                Some(stored(ClosingStatus::Authorized, ClosingDecision::Authorized, "abc")),
                "def"
            ),
            Err(ClosingError::StaleEvaluation(month()))
        );
        assert_eq!(
            ensure_can_sign_off(
                month(),
                Some(stored(ClosingStatus::Closed, ClosingDecision::Authorized, "abc")),
                "abc"
            ),
            Err(ClosingError::AlreadyClosed(month()))
        );
        let reopened = StoredEvaluation {
            status: ClosingStatus::Reopened,
            decision: None,
            input_hash: None,
        };
        assert_eq!(
            ensure_can_sign_off(month(), Some(reopened), "abc"),
            Err(ClosingError::NotEvaluated(month()))
        );
    }

    #[test]
    fn test_reopen() {
        assert!(ensure_can_reopen(month(), Some(ClosingStatus::Closed)).is_ok());
        assert!(matches!(
            ensure_can_reopen(month(), Some(ClosingStatus::Authorized)),
            Err(ClosingError::NotClosed { status: ClosingStatus::Authorized, .. })
        ));
        assert!(ensure_can_reopen(month(), None).is_err());
    }
}
