//! Finding the invoice a settled boleto pays.

use chrono::NaiveDate;
use contta_shared::types::CENT;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ofx_cnab::{NEAR_DAY_CONFIDENCE, SAME_DAY_CONFIDENCE};
use crate::billing::InvoiceStatus;
use crate::statements::CnabRecord;

/// Days around the settlement date searched for a due date.
pub const DUE_DATE_WINDOW_DAYS: i64 = 5;

/// An invoice that may be paid by a boleto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCandidate {
    /// Invoice id.
    pub invoice_id: Uuid,
    /// Number printed on the boleto.
    pub document_number: Option<String>,
    /// Invoice amount.
    pub amount: Decimal,
    /// Due date.
    pub due_date: NaiveDate,
    /// Current status.
    pub status: InvoiceStatus,
}

/// How the invoice was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceMatchMethod {
    /// Same document number and amount.
    DocumentNumber,
    /// Only pending invoice with this amount due near the settlement.
    AmountAndDueDate,
}

/// The invoice a boleto settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceMatch {
    /// Matched invoice.
    pub invoice_id: Uuid,
    /// Match certainty.
    pub confidence: Decimal,
    /// Strategy used.
    pub method: InvoiceMatchMethod,
}

fn same_amount(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < CENT
}

/// Looks up the invoice settled by `record`.
///
/// A pending invoice with the record's document number and amount wins.
/// Otherwise the pending invoices with that amount falling due within five
/// days of the settlement are considered, and only an unambiguous single
/// candidate is returned.
#[must_use]
pub fn match_invoice(record: &CnabRecord, invoices: &[InvoiceCandidate]) -> Option<InvoiceMatch> {
    let amount = record.settlement_amount();
    let pending = || {
        invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Pending && same_amount(i.amount, amount))
    };

    let document = record.document_number.trim();
    if !document.is_empty() {
        if let Some(invoice) =
            pending().find(|i| i.document_number.as_deref().map(str::trim) == Some(document))
        {
            return Some(InvoiceMatch {
                invoice_id: invoice.invoice_id,
                confidence: SAME_DAY_CONFIDENCE,
                method: InvoiceMatchMethod::DocumentNumber,
            });
        }
    }

    let settled_on = record.settlement_date()?;
    let mut near = pending()
        .filter(|i| (i.due_date - settled_on).num_days().abs() <= DUE_DATE_WINDOW_DAYS);
    let only = near.next()?;
    if near.next().is_some() {
        return None;
    }
    Some(InvoiceMatch {
        invoice_id: only.invoice_id,
        confidence: NEAR_DAY_CONFIDENCE,
        method: InvoiceMatchMethod::AmountAndDueDate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::CnabStatus;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, day).unwrap()
    }

    fn record(document: &str, amount: Decimal, day: u32) -> CnabRecord {
        CnabRecord {
            bank_reference: "000123".to_string(),
            document_number: document.to_string(),
            occurrence_code: "06".to_string(),
            status: CnabStatus::Settled,
            face_value: amount,
            paid_amount: amount,
            due_date: None,
            occurrence_date: None,
            credit_date: Some(d(day)),
            line_number: 1,
        }
    }

    fn invoice(n: u128, document: Option<&str>, amount: Decimal, due: u32) -> InvoiceCandidate {
        InvoiceCandidate {
            invoice_id: Uuid::from_u128(n),
            document_number: document.map(str::to_string),
            amount,
            due_date: d(due),
            status: InvoiceStatus::Pending,
        }
    }

    #[test]
    fn test_document_number_wins() {
        let invoices = [
            invoice(1, None, dec!(500), 10),
            invoice(2, Some("HON-7"), dec!(500), 28),
        ];
        let m = match_invoice(&record("HON-7", dec!(500), 11), &invoices).unwrap();
        assert_eq!(m.invoice_id, Uuid::from_u128(2));
        assert_eq!(m.confidence, dec!(0.99));
        assert_eq!(m.method, InvoiceMatchMethod::DocumentNumber);
    }

    #[test]
    fn test_single_candidate_by_due_date() {
        let invoices = [
            invoice(1, None, dec!(500), 10),
            invoice(2, None, dec!(500), 25),
            invoice(3, None, dec!(650), 10),
        ];
        let m = match_invoice(&record("", dec!(500), 14), &invoices).unwrap();
        assert_eq!(m.invoice_id, Uuid::from_u128(1));
        assert_eq!(m.confidence, dec!(0.95));
    }

    #[test]
    fn test_ambiguous_or_paid_gives_none() {
        let invoices = [invoice(1, None, dec!(500), 10), invoice(2, None, dec!(500), 12)];
        assert_eq!(match_invoice(&record("", dec!(500), 11), &invoices), None);

        let mut paid = invoice(1, Some("D1"), dec!(500), 10);
        paid.status = InvoiceStatus::Paid;
        assert_eq!(match_invoice(&record("D1", dec!(500), 10), &[paid]), None);
    }

    #[test]
    fn test_document_with_wrong_amount_falls_back() {
        let invoices = [invoice(1, Some("D1"), dec!(499), 10), invoice(2, None, dec!(500), 9)];
        let m = match_invoice(&record("D1", dec!(500), 10), &invoices).unwrap();
        assert_eq!(m.invoice_id, Uuid::from_u128(2));
        assert_eq!(m.method, InvoiceMatchMethod::AmountAndDueDate);
    }
}
