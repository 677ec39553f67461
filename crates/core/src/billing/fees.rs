//! Monthly accounting fees ("honorários").

use std::collections::HashSet;

use chrono::NaiveDate;
use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Day of the following month fee invoices fall due.
pub const FEE_DUE_DAY: u32 = 10;

/// A client as seen by fee generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeClient {
    /// Client id.
    pub client_id: Uuid,
    /// Client name.
    pub name: String,
    /// Contracted monthly fee.
    pub monthly_fee: Decimal,
    /// Only active clients are billed.
    pub is_active: bool,
    /// Analytical receivable account.
    pub account_code: String,
}

/// An invoice to be created by fee generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFee {
    /// Billed client.
    pub client_id: Uuid,
    /// Client name, for the entry history.
    pub client_name: String,
    /// Receivable account debited by the provision.
    pub account_code: String,
    /// Competence month.
    pub competence: FiscalMonth,
    /// Invoice amount.
    pub amount: Decimal,
    /// Due date (day 10 of the following month).
    pub due_date: NaiveDate,
    /// Provision entry date (last day of the competence).
    pub entry_date: NaiveDate,
    /// Invoice description.
    pub description: String,
    /// Idempotency reference.
    pub reference: String,
}

/// Output of [`plan_monthly_fees`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeePlan {
    /// Invoices to create.
    pub planned: Vec<PlannedFee>,
    /// Clients already billed for the competence.
    pub already_generated: usize,
    /// Inactive clients or clients without a fee.
    pub ineligible: usize,
}

impl FeePlan {
    /// Sum of the planned invoices.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.planned.iter().map(|f| f.amount).sum()
    }
}

/// Reference that makes generation idempotent per client and competence.
#[must_use]
pub fn fee_reference(client_id: Uuid, competence: FiscalMonth) -> String {
    format!("hon_{client_id}_{competence}")
}

/// Due date of a competence's fee: day 10 of the next month.
#[must_use]
pub fn fee_due_date(competence: FiscalMonth) -> NaiveDate {
    competence.next().day_clamped(FEE_DUE_DAY)
}

/// Plans one invoice per active client with a positive fee, skipping those
/// whose reference is already in `existing_references`.
#[must_use]
pub fn plan_monthly_fees(
    clients: &[FeeClient],
    competence: FiscalMonth,
    existing_references: &HashSet<String>,
) -> FeePlan {
    let mut plan = FeePlan::default();

    for client in clients {
        if !client.is_active || client.monthly_fee <= Decimal::ZERO {
            plan.ineligible += 1;
            continue;
        }
        let reference = fee_reference(client.client_id, competence);
        if existing_references.contains(&reference) {
            plan.already_generated += 1;
            continue;
        }
        plan.planned.push(PlannedFee {
            client_id: client.client_id,
            client_name: client.name.clone(),
            account_code: client.account_code.clone(),
            competence,
            amount: client.monthly_fee,
            due_date: fee_due_date(competence),
            entry_date: competence.last_day(),
            description: format!("Honorários contábeis {competence}"),
            reference,
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client(n: u128, fee: Decimal, is_active: bool) -> FeeClient {
        FeeClient {
            client_id: Uuid::from_u128(n),
            name: format!("Cliente {n}"),
            monthly_fee: fee,
            is_active,
            account_code: format!("1.1.2.01.{n:04}"),
        }
    }

    fn month(y: i32, m: u32) -> FiscalMonth {
        FiscalMonth::new(y, m).unwrap()
    }

    #[test]
    fn test_due_date_rolls_into_next_year() {
        assert_eq!(
            fee_due_date(month(2024, 12)),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
    }

    #[test]
    fn test_plan_skips_ineligible_and_existing() {
        let competence = month(2025, 1);
        let clients = vec![
            client(1, dec!(1500), true),
            client(2, dec!(0), true),
            client(3, dec!(900), false),
            client(4, dec!(700), true),
        ];
        let existing: HashSet<String> =
            [fee_reference(Uuid::from_u128(4), competence)].into_iter().collect();

        let plan = plan_monthly_fees(&clients, competence, &existing);

        assert_eq!(plan.planned.len(), 1);
        assert_eq!(plan.ineligible, 2);
        assert_eq!(plan.already_generated, 1);
        assert_eq!(plan.total(), dec!(1500));

        let fee = &plan.planned[0];
        assert_eq!(fee.reference, format!("hon_{}_2025-01", Uuid::from_u128(1)));
        assert_eq!(fee.entry_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(fee.due_date, NaiveDate::from_ymd_opt(2025, 2, 10).unwrap());
        assert_eq!(fee.description, "Honorários contábeis 2025-01");
    }

    #[test]
    fn test_plan_is_idempotent_once_references_exist() {
        let competence = month(2025, 2);
        let clients = vec![client(1, dec!(100), true)];
        let first = plan_monthly_fees(&clients, competence, &HashSet::new());
        let existing: HashSet<String> = first.planned.iter().map(|f| f.reference.clone()).collect();
        let second = plan_monthly_fees(&clients, competence, &existing);
        assert!(second.planned.is_empty());
        assert_eq!(second.already_generated, 1);
    }
}
