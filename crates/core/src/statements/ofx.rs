//! OFX bank statements, SGML (OFX 1.x, unclosed tags) or XML (OFX 2.x).

use chrono::NaiveDate;
use contta_shared::types::parse_brl;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dates::parse_ofx_date;
use super::error::StatementError;
use super::{Direction, StatementLine};

/// Description used when a transaction carries neither memo nor name.
pub const DEFAULT_DESCRIPTION: &str = "Transação";

/// A transaction from the `<BANKTRANLIST>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfxTransaction {
    /// Bank's unique id (`FITID`).
    pub fitid: Option<String>,
    /// `TRNTYPE` (CREDIT, DEBIT, XFER...).
    pub trn_type: Option<String>,
    /// Posting date.
    pub date: NaiveDate,
    /// Signed amount: positive for money in.
    pub amount: Decimal,
    /// Memo, else name/payee, else a default.
    pub description: String,
}

impl OfxTransaction {
    /// Money in.
    #[must_use]
    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Converts to the common statement line.
    #[must_use]
    pub fn to_line(&self) -> StatementLine {
        StatementLine {
            date: self.date,
            description: self.description.clone(),
            amount: self.amount.abs(),
            direction: if self.amount.is_sign_negative() && !self.amount.is_zero() {
                Direction::Debit
            } else {
                Direction::Credit
            },
            reference: self.fitid.clone(),
        }
    }
}

/// A parsed OFX statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfxStatement {
    /// `BANKID`.
    pub bank_id: Option<String>,
    /// `ACCTID`.
    pub account_id: Option<String>,
    /// `DTSTART`.
    pub start_date: Option<NaiveDate>,
    /// `DTEND`.
    pub end_date: Option<NaiveDate>,
    /// `BALAMT` of the ledger balance.
    pub ledger_balance: Option<Decimal>,
    /// Transactions in file order.
    pub transactions: Vec<OfxTransaction>,
}

/// Value of the first `<TAG>` in `text`, up to the next tag or line end.
fn tag_value(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag.to_ascii_uppercase());
    let upper = text.to_ascii_uppercase();
    let start = upper.find(&open)? + open.len();
    let rest = &text[start..];
    let end = rest.find(['<', '\r', '\n']).unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_block(block: &str) -> Option<OfxTransaction> {
    let date = tag_value(block, "DTPOSTED").and_then(|d| parse_ofx_date(&d))?;
    let amount = tag_value(block, "TRNAMT").and_then(|a| parse_brl(&a).ok())?;

    let description = tag_value(block, "MEMO")
        .or_else(|| tag_value(block, "NAME"))
        .or_else(|| tag_value(block, "PAYEE"))
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    Some(OfxTransaction {
        fitid: tag_value(block, "FITID"),
        trn_type: tag_value(block, "TRNTYPE"),
        date,
        amount,
        description,
    })
}

/// Parses an OFX statement.
///
/// Transaction blocks lacking a date or an amount are skipped.
///
/// # Errors
///
/// `StatementError::InvalidFormat` when there is neither an `<OFX>` root
/// nor any `<STMTTRN>` block.
pub fn parse_ofx(content: &str) -> Result<OfxStatement, StatementError> {
    let upper = content.to_ascii_uppercase();
    let openings: Vec<usize> = upper.match_indices("<STMTTRN>").map(|(i, _)| i).collect();
    if openings.is_empty() && !upper.contains("<OFX>") {
        return Err(StatementError::InvalidFormat(
            "no <OFX> root and no <STMTTRN> blocks".to_string(),
        ));
    }

    let open_len = "<STMTTRN>".len();
    let header = &content[..openings.first().copied().unwrap_or(content.len())];
    let trailer = &content[openings.last().map_or(content.len(), |i| i + open_len)..];

    let mut transactions = Vec::with_capacity(openings.len());
    for (n, &start) in openings.iter().enumerate() {
        let body_start = start + open_len;
        let limit = openings.get(n + 1).copied().unwrap_or(content.len());
        let upper_body = &upper[body_start..limit];
        let end = ["</STMTTRN>", "</BANKTRANLIST>"]
            .iter()
            .filter_map(|closing| upper_body.find(closing))
            .min()
            .unwrap_or(upper_body.len());
        if let Some(tx) = parse_block(&content[body_start..body_start + end]) {
            transactions.push(tx);
        }
    }

    let balance_source = if trailer.to_ascii_uppercase().contains("<BALAMT>") {
        trailer
    } else {
        content
    };

    Ok(OfxStatement {
        bank_id: tag_value(header, "BANKID"),
        account_id: tag_value(header, "ACCTID"),
        start_date: tag_value(header, "DTSTART").and_then(|d| parse_ofx_date(&d)),
        end_date: tag_value(header, "DTEND").and_then(|d| parse_ofx_date(&d)),
        ledger_balance: tag_value(balance_source, "BALAMT").and_then(|b| parse_brl(&b).ok()),
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SGML: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<BANKMSGSRSV1><STMTTRNRS><STMTRS>
<CURDEF>BRL
<BANKACCTFROM>
<BANKID>0756
<ACCTID>12345-6
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20250101
<DTEND>20250131
<STMTTRN>
<TRNTYPE>CREDIT
<DTPOSTED>20250110120000[-3:BRT]
<TRNAMT>1500,00
<FITID>202501100001
<MEMO>PIX RECEBIDO - PADARIA CENTRAL LTDA
</STMTTRN>
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20250112
<TRNAMT>-89.90
<FITID>202501120002
<NAME>TARIFA PACOTE SERVICOS
</STMTTRN>
<STMTTRN>
<TRNTYPE>DEBIT
<TRNAMT>-10.00
<FITID>broken
</STMTTRN>
</BANKTRANLIST>
<LEDGERBAL>
<BALAMT>5410.10
<DTASOF>20250131
</LEDGERBAL>
</STMTRS></STMTTRNRS></BANKMSGSRSV1>
</OFX>";

    #[test]
    fn test_parse_sgml() {
        let statement = parse_ofx(SGML).unwrap();
        assert_eq!(statement.bank_id.as_deref(), Some("0756"));
        assert_eq!(statement.account_id.as_deref(), Some("12345-6"));
        assert_eq!(statement.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(statement.end_date, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(statement.ledger_balance, Some(dec!(5410.10)));
        assert_eq!(statement.transactions.len(), 2);

        let credit = &statement.transactions[0];
        assert_eq!(credit.amount, dec!(1500.00));
        assert_eq!(credit.fitid.as_deref(), Some("202501100001"));
        assert_eq!(credit.description, "PIX RECEBIDO - PADARIA CENTRAL LTDA");
        assert!(credit.is_credit());

        let debit = statement.transactions[1].to_line();
        assert_eq!(debit.direction, Direction::Debit);
        assert_eq!(debit.amount, dec!(89.90));
        assert_eq!(debit.description, "TARIFA PACOTE SERVICOS");
    }

    #[test]
    fn test_parse_xml() {
        let xml = r#"<?xml version="1.0"?><OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS>
<BANKTRANLIST><STMTTRN><TRNTYPE>CREDIT</TRNTYPE><DTPOSTED>20250203</DTPOSTED>
<TRNAMT>250.75</TRNAMT><FITID>X1</FITID></STMTTRN></BANKTRANLIST></STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>"#;
        let statement = parse_ofx(xml).unwrap();
        assert_eq!(statement.transactions.len(), 1);
        let tx = &statement.transactions[0];
        assert_eq!(tx.amount, dec!(250.75));
        assert_eq!(tx.description, DEFAULT_DESCRIPTION);
        assert_eq!(tx.fitid.as_deref(), Some("X1"));
    }

    #[test]
    fn test_empty_statement_with_root_is_valid() {
        let statement = parse_ofx("<OFX><BANKTRANLIST></BANKTRANLIST></OFX>").unwrap();
        assert!(statement.transactions.is_empty());
    }

    #[test]
    fn test_rejects_non_ofx() {
        assert!(matches!(
            parse_ofx("date;description;amount\n01/01/2025;x;1"),
            Err(StatementError::InvalidFormat(_))
        ));
    }
}
