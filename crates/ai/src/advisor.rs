//! The gateway as a classification advisor.

use std::fmt::Write as _;

use async_trait::async_trait;
use contta_core::classification::{
    AdvisorError, AdvisorSuggestion, ChartAccount, ClassificationAdvisor,
};
use contta_core::statements::{Direction, StatementLine};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::client::AiGateway;
use crate::models::ChatMessage;

const SYSTEM_PROMPT: &str = "Você é um contador brasileiro classificando lançamentos de extrato \
bancário de um escritório de contabilidade. Escolha exatamente uma conta do plano de contas \
fornecido como contrapartida do banco. Responda apenas com JSON no formato \
{\"account_code\": \"<código>\", \"confidence\": <0 a 1>, \"rationale\": \"<motivo curto>\"}.";

#[derive(Debug, Deserialize)]
struct SuggestionReply {
    account_code: String,
    confidence: Decimal,
    #[serde(default)]
    rationale: String,
}

/// Renders the line and the candidate accounts for the model.
pub(crate) fn user_prompt(line: &StatementLine, chart: &[ChartAccount]) -> String {
    let direction = match line.direction {
        Direction::Credit => "entrada (crédito)",
        Direction::Debit => "saída (débito)",
    };
    let mut prompt = format!(
        "Lançamento:\n- data: {}\n- descrição: {}\n- valor: {}\n- tipo: {direction}\n\nPlano de contas:\n",
        line.date,
        line.description.trim(),
        line.amount,
    );
    for account in chart {
        let _ = writeln!(prompt, "- {} {}", account.code, account.name);
    }
    prompt
}

#[async_trait]
impl ClassificationAdvisor for AiGateway {
    async fn suggest(
        &self,
        line: &StatementLine,
        chart: &[ChartAccount],
    ) -> Result<AdvisorSuggestion, AdvisorError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(line, chart)),
        ];
        let reply: SuggestionReply = self.complete_json(&messages).await?;
        Ok(AdvisorSuggestion {
            account_code: reply.account_code.trim().to_string(),
            confidence: reply.confidence,
            rationale: reply.rationale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_user_prompt_lists_accounts() {
        let line = StatementLine::from_signed(
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            "PAG BOLETO IMOBILIARIA SOL",
            dec!(-2500.00),
            None,
        );
        let chart = vec![
            ChartAccount {
                code: "4.1.2.01".to_string(),
                name: "Aluguel".to_string(),
            },
            ChartAccount {
                code: "4.1.1.01".to_string(),
                name: "Energia Elétrica".to_string(),
            },
        ];
        let prompt = user_prompt(&line, &chart);
        assert!(prompt.contains("PAG BOLETO IMOBILIARIA SOL"));
        assert!(prompt.contains("2500.00"));
        assert!(prompt.contains("saída"));
        assert!(prompt.contains("- 4.1.2.01 Aluguel"));
    }
}
