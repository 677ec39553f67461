//! Pairing statement credits with settled boletos.

use chrono::NaiveDate;
use contta_shared::types::CENT;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::statements::{CnabRecord, OfxTransaction};

/// Largest date distance accepted between a credit and a settlement.
pub const MAX_DAYS_APART: i64 = 2;

/// Confidence of a same-day match.
pub const SAME_DAY_CONFIDENCE: Decimal = Decimal::from_parts(99, 0, 0, false, 2);

/// Confidence of a match within [`MAX_DAYS_APART`].
pub const NEAR_DAY_CONFIDENCE: Decimal = Decimal::from_parts(95, 0, 0, false, 2);

/// A credit paired with a settled boleto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfxCnabMatch {
    /// Position of the transaction in the OFX list.
    pub ofx_index: usize,
    /// Position of the record in the CNAB list.
    pub cnab_index: usize,
    /// OFX `FITID`.
    pub ofx_fitid: Option<String>,
    /// Credited amount.
    pub ofx_amount: Decimal,
    /// Credit date.
    pub ofx_date: NaiveDate,
    /// Nosso número.
    pub cnab_reference: String,
    /// Document number, or the nosso número when blank.
    pub cnab_document: String,
    /// Settlement amount.
    pub cnab_amount: Decimal,
    /// Settlement date.
    pub cnab_date: NaiveDate,
    /// Match certainty.
    pub confidence: Decimal,
}

/// Result of [`match_ofx_cnab`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Transactions in the OFX file.
    pub total_ofx_transactions: usize,
    /// Records in the CNAB file.
    pub total_cnab_transactions: usize,
    /// Pairs found.
    pub matched_transactions: usize,
    /// OFX credits without a pair.
    pub unmatched_ofx: usize,
    /// CNAB records without a pair.
    pub unmatched_cnab: usize,
    /// The pairs, in OFX order.
    pub matches: Vec<OfxCnabMatch>,
}

/// Pairs each OFX credit with the first unused settled CNAB record of the
/// same amount (within one cent) settled at most two days apart.
#[must_use]
pub fn match_ofx_cnab(ofx: &[OfxTransaction], cnab: &[CnabRecord]) -> ReconciliationReport {
    let mut used = vec![false; cnab.len()];
    let mut report = ReconciliationReport {
        total_ofx_transactions: ofx.len(),
        total_cnab_transactions: cnab.len(),
        ..ReconciliationReport::default()
    };

    for (ofx_index, tx) in ofx.iter().enumerate().filter(|(_, tx)| tx.is_credit()) {
        let found = cnab.iter().enumerate().find_map(|(i, record)| {
            if used[i] || !record.is_settled() {
                return None;
            }
            let settled_on = record.settlement_date()?;
            let amount = record.settlement_amount();
            if (tx.amount - amount).abs() > CENT {
                return None;
            }
            let days = (tx.date - settled_on).num_days().abs();
            (days <= MAX_DAYS_APART).then_some((i, record, amount, settled_on, days))
        });

        match found {
            Some((cnab_index, record, amount, settled_on, days)) => {
                used[cnab_index] = true;
                report.matches.push(OfxCnabMatch {
                    ofx_index,
                    cnab_index,
                    ofx_fitid: tx.fitid.clone(),
                    ofx_amount: tx.amount,
                    ofx_date: tx.date,
                    cnab_reference: record.bank_reference.clone(),
                    cnab_document: if record.document_number.is_empty() {
                        record.bank_reference.clone()
                    } else {
                        record.document_number.clone()
                    },
                    cnab_amount: amount,
                    cnab_date: settled_on,
                    confidence: if days == 0 {
                        SAME_DAY_CONFIDENCE
                    } else {
                        NEAR_DAY_CONFIDENCE
                    },
                });
            }
            None => report.unmatched_ofx += 1,
        }
    }

    report.matched_transactions = report.matches.len();
    report.unmatched_cnab = cnab.len() - report.matched_transactions;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::CnabStatus;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn ofx(day: u32, amount: Decimal) -> OfxTransaction {
        OfxTransaction {
            fitid: Some(format!("F{day}")),
            trn_type: None,
            date: d(day),
            amount,
            description: "LIQUIDACAO COBRANCA".to_string(),
        }
    }

    fn cnab(reference: &str, status: CnabStatus, day: u32, amount: Decimal) -> CnabRecord {
        CnabRecord {
            bank_reference: reference.to_string(),
            document_number: String::new(),
            occurrence_code: "06".to_string(),
            status,
            face_value: amount,
            paid_amount: Decimal::ZERO,
            due_date: None,
            occurrence_date: Some(d(day)),
            credit_date: None,
            line_number: 1,
        }
    }

    #[test]
    fn test_same_day_and_near_day() {
        let report = match_ofx_cnab(
            &[ofx(10, dec!(150.00)), ofx(12, dec!(80.00))],
            &[
                cnab("A", CnabStatus::Settled, 10, dec!(150.00)),
                cnab("B", CnabStatus::Settled, 10, dec!(80.01)),
            ],
        );
        assert_eq!(report.matched_transactions, 2);
        assert_eq!(report.matches[0].confidence, dec!(0.99));
        assert_eq!(report.matches[1].confidence, dec!(0.95));
        assert_eq!(report.matches[1].cnab_document, "B");
        assert_eq!(report.unmatched_ofx, 0);
        assert_eq!(report.unmatched_cnab, 0);
    }

    #[test]
    fn test_only_settled_and_unused_records() {
        let report = match_ofx_cnab(
            &[ofx(10, dec!(50)), ofx(10, dec!(50)), ofx(10, dec!(-50))],
            &[
                cnab("R", CnabStatus::Registered, 10, dec!(50)),
                cnab("S", CnabStatus::Settled, 10, dec!(50)),
            ],
        );
        assert_eq!(report.total_ofx_transactions, 3);
        assert_eq!(report.matched_transactions, 1);
        assert_eq!(report.matches[0].cnab_reference, "S");
        assert_eq!(report.unmatched_ofx, 1);
        assert_eq!(report.unmatched_cnab, 1);
    }

    #[test]
    fn test_limits() {
        let report = match_ofx_cnab(
            &[ofx(13, dec!(100)), ofx(10, dec!(100.02))],
            &[cnab("X", CnabStatus::Settled, 10, dec!(100))],
        );
        assert_eq!(report.matched_transactions, 0);
        assert_eq!(report.unmatched_ofx, 2);
    }
}
