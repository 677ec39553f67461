//! Pattern rules over the bank history text.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Classification, ClassificationKind, Confidence, ExpenseCategory};
use crate::ledger::{ChartCodes, EntryLine};
use crate::statements::{Direction, StatementLine};

/// Collection id used when the history has no `COBnnn` token.
pub const UNIDENTIFIED_COLLECTION: &str = "COB_NAO_IDENTIFICADO";

/// A client that may appear as payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownClient {
    /// Client id.
    pub client_id: Uuid,
    /// Registered name.
    pub name: String,
    /// CNPJ/CPF, digits only.
    pub document: String,
    /// Analytical receivable account (`1.1.2.01.NNNN`).
    pub account_code: String,
}

/// Clients of a tenant searched when identifying payers.
#[derive(Debug, Clone, Default)]
pub struct ClientDirectory {
    clients: Vec<KnownClient>,
}

impl ClientDirectory {
    /// Builds a directory.
    #[must_use]
    pub fn new(clients: Vec<KnownClient>) -> Self {
        Self { clients }
    }

    /// Clients whose name contains `fragment`, ignoring case.
    fn by_name_fragment(&self, fragment: &str) -> Option<&KnownClient> {
        let needle: String = fragment.to_uppercase().chars().take(20).collect();
        self.clients
            .iter()
            .find(|c| c.name.to_uppercase().contains(&needle))
    }

    fn by_document(&self, digits: &str) -> Option<&KnownClient> {
        self.clients.iter().find(|c| c.document == digits)
    }

    /// Number of clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if there are no clients.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn pattern(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

/// Compiled classification patterns.
#[derive(Debug, Clone)]
pub struct Classifier {
    collection: Regex,
    collection_id: Regex,
    pix_received: Regex,
    ted_received: Regex,
    document: Regex,
    expenses: Vec<(ExpenseCategory, Regex)>,
}

impl Classifier {
    /// Compiles the patterns.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            collection: pattern(
                r"COB\d+|COBRAN[CÇ]A|LIQ\.?\s?COB|LIQUIDA[CÇ][AÃ]O\s*COBRAN[CÇ]A",
            )?,
            collection_id: pattern(r"COB\d+")?,
            pix_received: pattern(
                r"PIX[_\s]?CRED|PIX\s*RECEBIDO|RECEBIMENTO\s*PIX|REC\s*PIX",
            )?,
            ted_received: pattern(r"TED\s*RECEBID[OA]|CR[EÉ]DITO\s*TED|TED\s*CRED|REC\s*TED")?,
            document: Regex::new(r"\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}")?,
            expenses: vec![
                (
                    ExpenseCategory::Energy,
                    pattern(r"CELESC|CPFL|ENEL|ENERGISA|CEMIG|COPEL|EQUATORIAL|ENERGIA|\bLUZ\b")?,
                ),
                (
                    ExpenseCategory::Water,
                    pattern(r"SANEPAR|SANEAGO|COPASA|SABESP|SANASA|CAESB|[AÁ]GUA|ESGOTO")?,
                ),
                (
                    ExpenseCategory::Telecom,
                    pattern(r"\bVIVO\b|\bCLARO\b|\bTIM\b|\bOI\b|TELEFON|INTERNET|\bNET\b|GVT")?,
                ),
                (
                    ExpenseCategory::BankFees,
                    pattern(r"TARIFA|TAR\s*MANUT|PACOTE\s*SERVI|CESTA\s*SERVI")?,
                ),
            ],
        })
    }

    /// Classifies a statement line.
    #[must_use]
    pub fn classify(
        &self,
        line: &StatementLine,
        clients: &ClientDirectory,
        chart: &ChartCodes,
    ) -> Classification {
        match line.direction {
            Direction::Credit => self.classify_credit(line, clients, chart),
            Direction::Debit => self.classify_debit(line, chart),
        }
    }

    fn classify_credit(
        &self,
        line: &StatementLine,
        clients: &ClientDirectory,
        chart: &ChartCodes,
    ) -> Classification {
        let text = line.description.trim();
        let amount = line.amount;
        let bank = EntryLine::debit(&chart.bank, amount);

        if self.collection.is_match(text) {
            let id = self
                .collection_id
                .find(text)
                .map_or_else(|| UNIDENTIFIED_COLLECTION.to_string(), |m| m.as_str().to_uppercase());
            return Classification {
                kind: ClassificationKind::Collection,
                lines: vec![bank, EntryLine::credit(&chart.transitory_credits, amount)],
                description: format!("Cobrança {id} - aguarda desmembramento"),
                confidence: Confidence::High,
                needs_split: true,
                collection_id: Some(id),
                client_id: None,
            };
        }

        if self.pix_received.is_match(text) || self.ted_received.is_match(text) {
            if let Some(client) = self.identify_client(text, clients) {
                return Classification {
                    kind: ClassificationKind::ClientReceipt,
                    lines: vec![bank, EntryLine::credit(&client.account_code, amount)],
                    description: format!("Recebimento {}", client.name),
                    confidence: Confidence::High,
                    needs_split: false,
                    collection_id: None,
                    client_id: Some(client.client_id),
                };
            }
            return Classification {
                kind: ClassificationKind::UnidentifiedReceipt,
                lines: vec![bank, EntryLine::credit(&chart.pending_identification, amount)],
                description: format!("Recebimento não identificado - {}", excerpt(text, 50)),
                confidence: Confidence::Low,
                needs_split: false,
                collection_id: None,
                client_id: None,
            };
        }

        Classification {
            kind: ClassificationKind::UnidentifiedCredit,
            lines: vec![bank, EntryLine::credit(&chart.transitory_credits, amount)],
            description: format!("Crédito a identificar - {}", excerpt(text, 50)),
            confidence: Confidence::Low,
            needs_split: false,
            collection_id: None,
            client_id: None,
        }
    }

    fn classify_debit(&self, line: &StatementLine, chart: &ChartCodes) -> Classification {
        let text = line.description.trim();
        let amount = line.amount;
        let bank = EntryLine::credit(&chart.bank, amount);

        let category = self
            .expenses
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(category, _)| *category);

        match category {
            Some(category) => Classification {
                kind: ClassificationKind::Expense(category),
                lines: vec![EntryLine::debit(category.account_code(chart), amount), bank],
                description: format!("{} - {}", category.label(), excerpt(text, 40)),
                confidence: Confidence::High,
                needs_split: false,
                collection_id: None,
                client_id: None,
            },
            None => Classification {
                kind: ClassificationKind::UnidentifiedDebit,
                lines: vec![EntryLine::debit(&chart.transitory_debits, amount), bank],
                description: format!("Débito a classificar - {}", excerpt(text, 40)),
                confidence: Confidence::Low,
                needs_split: false,
                collection_id: None,
                client_id: None,
            },
        }
    }

    /// Payer lookup: name fragments after a dash, then a CNPJ in the text.
    fn identify_client<'c>(
        &self,
        text: &str,
        clients: &'c ClientDirectory,
    ) -> Option<&'c KnownClient> {
        let by_name = text
            .split(['-', '–'])
            .skip(1)
            .map(str::trim)
            .filter(|fragment| fragment.chars().count() >= 4)
            .find_map(|fragment| clients.by_name_fragment(fragment));
        if by_name.is_some() {
            return by_name;
        }

        let found = self.document.find(text)?;
        let digits: String = found.as_str().chars().filter(char::is_ascii_digit).collect();
        clients.by_document(&digits)
    }
}

fn excerpt(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
