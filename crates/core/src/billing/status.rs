//! Invoice and expense lifecycles.

use serde::{Deserialize, Serialize};

use super::error::BillingError;

/// Invoice lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Waiting for payment.
    Pending,
    /// Settled.
    Paid,
    /// Cancelled before payment.
    Canceled,
}

/// Expense lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Provisioned, not paid.
    Pending,
    /// Paid.
    Paid,
    /// Cancelled.
    Canceled,
}

macro_rules! status_strings {
    ($ty:ty) => {
        impl $ty {
            /// Returns the snake_case name.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    Self::Pending => "pending",
                    Self::Paid => "paid",
                    Self::Canceled => "canceled",
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    "pending" => Ok(Self::Pending),
                    "paid" => Ok(Self::Paid),
                    "canceled" | "cancelled" => Ok(Self::Canceled),
                    _ => Err(format!("Unknown status: {s}")),
                }
            }
        }
    };
}

status_strings!(InvoiceStatus);
status_strings!(ExpenseStatus);

impl InvoiceStatus {
    /// Only pending invoices may be cancelled.
    pub fn ensure_cancellable(self) -> Result<(), BillingError> {
        match self {
            Self::Pending => Ok(()),
            other => Err(BillingError::InvoiceNotPending(other)),
        }
    }

    /// Only pending invoices may be settled.
    pub fn ensure_payable(self) -> Result<(), BillingError> {
        self.ensure_cancellable()
    }
}

impl ExpenseStatus {
    /// Only pending expenses may be paid.
    pub fn ensure_payable(self) -> Result<(), BillingError> {
        match self {
            Self::Pending => Ok(()),
            other => Err(BillingError::ExpenseNotPending(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for status in [InvoiceStatus::Pending, InvoiceStatus::Paid, InvoiceStatus::Canceled] {
            assert_eq!(status.as_str().parse::<InvoiceStatus>(), Ok(status));
        }
        assert_eq!("cancelled".parse::<ExpenseStatus>(), Ok(ExpenseStatus::Canceled));
        assert!("overdue".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_guards() {
        assert!(InvoiceStatus::Pending.ensure_cancellable().is_ok());
        assert_eq!(
            InvoiceStatus::Paid.ensure_cancellable(),
            Err(BillingError::InvoiceNotPending(InvoiceStatus::Paid))
        );
        assert!(ExpenseStatus::Canceled.ensure_payable().is_err());
    }
}
