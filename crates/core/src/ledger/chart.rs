//! Chart of accounts helpers.
//!
//! Codes are dotted paths (`1.1.2.01.0007`). The first segment gives the
//! account group; analytical client receivables hang under a configurable
//! synthetic parent.

use serde::{Deserialize, Serialize};

pub use contta_shared::config::ChartConfig as ChartCodes;

use super::error::LedgerError;

/// Suffix reserved for the "pending identification" receivable.
pub const RESERVED_CLIENT_SUFFIX: u32 = 9999;

/// Account group, derived from the first code segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// `1.*`
    Asset,
    /// `2.*` except `2.3.*`
    Liability,
    /// `2.3.*` (patrimônio líquido)
    Equity,
    /// `3.*`
    Revenue,
    /// `4.*` and above
    Expense,
}

impl AccountType {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    /// Debit-nature groups grow with debits.
    #[must_use]
    pub const fn is_debit_nature(&self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }
}

/// Infers the account group from a code. Returns `None` for malformed codes.
#[must_use]
pub fn account_type_for_code(code: &str) -> Option<AccountType> {
    let mut segments = code.split('.');
    let first = segments.next()?;
    match first {
        "1" => Some(AccountType::Asset),
        "2" if segments.next() == Some("3") => Some(AccountType::Equity),
        "2" => Some(AccountType::Liability),
        "3" => Some(AccountType::Revenue),
        "4" | "5" | "6" => Some(AccountType::Expense),
        _ => None,
    }
}

/// Returns true if `code` is a well formed dotted code (`1`, `1.1.2.01`, ...).
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()))
}

/// Parent code (`1.1.2.01.0003` -> `1.1.2.01`).
#[must_use]
pub fn parent_code(code: &str) -> Option<&str> {
    code.rsplit_once('.').map(|(parent, _)| parent)
}

/// Next free analytical code under `parent`, four digits, skipping the
/// reserved `9999`.
///
/// # Errors
///
/// Returns `LedgerError::ClientAccountsExhausted` when `9998` is taken.
pub fn next_client_account_code<'a, I>(parent: &str, existing: I) -> Result<String, LedgerError>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = format!("{parent}.");
    let highest = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(&prefix))
        .filter(|suffix| suffix.len() == 4)
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .filter(|n| *n != RESERVED_CLIENT_SUFFIX)
        .max()
        .unwrap_or(0);

    let next = highest + 1;
    if next >= RESERVED_CLIENT_SUFFIX {
        return Err(LedgerError::ClientAccountsExhausted(parent.to_string()));
    }
    Ok(format!("{parent}.{next:04}"))
}

/// Payable account matching an expense account: a leading `4.1` becomes
/// `2.1`, anything else falls back to the generic payables account.
#[must_use]
pub fn payable_for(expense_code: &str, chart: &ChartCodes) -> String {
    match expense_code.strip_prefix("4.1") {
        Some(rest) if rest.is_empty() || rest.starts_with('.') => format!("2.1{rest}"),
        _ => chart.payables.clone(),
    }
}

/// An account of the standard chart installed for new tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardAccount {
    /// Dotted code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Group.
    pub account_type: AccountType,
    /// Whether entries may post to it.
    pub is_analytical: bool,
}

fn account(code: &str, name: &str, is_analytical: bool) -> Option<StandardAccount> {
    Some(StandardAccount {
        code: code.to_string(),
        name: name.to_string(),
        account_type: account_type_for_code(code)?,
        is_analytical,
    })
}

/// The minimal chart the postings rely on, using the configured codes.
#[must_use]
pub fn standard_chart(chart: &ChartCodes) -> Vec<StandardAccount> {
    let mut accounts: Vec<StandardAccount> = [
        account("1", "ATIVO", false),
        account("1.1", "ATIVO CIRCULANTE", false),
        account("1.1.1", "Disponível", false),
        account(&chart.bank, "Banco Conta Movimento", true),
        account("1.1.2", "Créditos", false),
        account(&chart.client_receivables, "Clientes a Receber", false),
        account(&chart.pending_identification, "Recebimentos a Identificar", true),
        account("1.1.9", "Contas Transitórias", false),
        account(&chart.transitory_debits, "Transitória Débitos", true),
        account("2", "PASSIVO", false),
        account("2.1", "PASSIVO CIRCULANTE", false),
        account("2.1.1", "Fornecedores", false),
        account(&chart.payables, "Contas a Pagar", true),
        account("2.1.9", "Contas Transitórias", false),
        account(&chart.transitory_credits, "Transitória Créditos", true),
        account("2.3", "PATRIMÔNIO LÍQUIDO", false),
        account("3", "RECEITAS", false),
        account("3.1", "Receitas Operacionais", false),
        account("3.1.1", "Receita de Serviços", false),
        account(&chart.fee_revenue, "Honorários Contábeis", true),
        account("4", "DESPESAS", false),
        account("4.1", "Despesas Operacionais", false),
        account("4.1.1", "Utilidades", false),
        account(&chart.energy, "Energia Elétrica", true),
        account(&chart.water, "Água e Esgoto", true),
        account(&chart.telecom, "Telefone e Internet", true),
        account("4.3", "Despesas Financeiras", false),
        account("4.3.1", "Despesas Bancárias", false),
        account(&chart.bank_fees, "Tarifas Bancárias", true),
    ]
    .into_iter()
    .flatten()
    .collect();

    accounts.sort_by(|a, b| a.code.cmp(&b.code));
    accounts.dedup_by(|a, b| a.code == b.code);
    accounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_next_client_code_starts_at_one() {
        let code = next_client_account_code("1.1.2.01", std::iter::empty()).unwrap();
        assert_eq!(code, "1.1.2.01.0001");
    }

    #[test]
    fn test_next_client_code_skips_reserved_and_foreign_codes() {
        let existing = ["1.1.2.01.0001", "1.1.2.01.0007", "1.1.2.01.9999", "1.1.2.02.0100", "1.1.2.01.12"];
        let code = next_client_account_code("1.1.2.01", existing).unwrap();
        assert_eq!(code, "1.1.2.01.0008");
    }

    #[test]
    fn test_next_client_code_exhausted() {
        let result = next_client_account_code("1.1.2.01", ["1.1.2.01.9998"]);
        assert!(matches!(result, Err(LedgerError::ClientAccountsExhausted(_))));
    }

    #[rstest]
    #[case("4.1.1.01", "2.1.1.01")]
    #[case("4.1.2.03", "2.1.2.03")]
    #[case("4.3.1.02", "2.1.1.01")]
    #[case("4.10.1", "2.1.1.01")]
    fn test_payable_for(#[case] expense: &str, #[case] payable: &str) {
        assert_eq!(payable_for(expense, &ChartCodes::default()), payable);
    }

    #[rstest]
    #[case("1.1.1.05", Some(AccountType::Asset))]
    #[case("2.1.9.01", Some(AccountType::Liability))]
    #[case("2.3.1", Some(AccountType::Equity))]
    #[case("3.1.1.01", Some(AccountType::Revenue))]
    #[case("4.3.1.02", Some(AccountType::Expense))]
    #[case("9.1", None)]
    #[case("", None)]
    fn test_account_type_for_code(#[case] code: &str, #[case] expected: Option<AccountType>) {
        assert_eq!(account_type_for_code(code), expected);
    }

    #[test]
    fn test_code_helpers() {
        assert!(is_valid_code("1.1.2.01.0003"));
        assert!(!is_valid_code("1..2"));
        assert!(!is_valid_code("1.a"));
        assert_eq!(parent_code("1.1.2.01.0003"), Some("1.1.2.01"));
        assert_eq!(parent_code("1"), None);
    }

    #[test]
    fn test_standard_chart_contains_configured_codes() {
        let chart = ChartCodes::default();
        let accounts = standard_chart(&chart);
        for code in [
            &chart.bank,
            &chart.pending_identification,
            &chart.transitory_debits,
            &chart.transitory_credits,
            &chart.fee_revenue,
            &chart.bank_fees,
        ] {
            let account = accounts.iter().find(|a| &a.code == code).unwrap();
            assert!(account.is_analytical);
        }
        let parent = accounts.iter().find(|a| a.code == chart.client_receivables).unwrap();
        assert!(!parent.is_analytical);
        assert!(accounts.windows(2).all(|w| w[0].code < w[1].code));
    }
}
