//! Statement import, rule matching and collection splits.

mod common;

use chrono::NaiveDate;
use contta_core::billing::{ExpenseStatus, InvoiceStatus};
use contta_core::classification::Classifier;
use contta_core::ledger::ChartCodes;
use contta_core::reconciliation::{RuleType, apply_rules};
use contta_core::statements::{StatementLine, idempotency_key};
use contta_db::repositories::{
    BankTransactionRepository, ClientRepository, CreateExpenseInput, CreateInvoiceInput,
    CreateRuleInput, ExpenseRepository, InvoiceRepository, NewBankLine, Posting,
    ReconciliationRepository, SplitRequest,
};
use contta_shared::types::FiscalMonth;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_reimport_is_detected_by_key() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let tenant = common::new_tenant(&db).await;
    let bank = BankTransactionRepository::new(db.clone());

    let line = StatementLine::from_signed(
        day(3),
        "TARIFA PACOTE SERVICOS",
        dec!(-39.90),
        Some("FIT-0001".to_string()),
    );
    let key = idempotency_key(&line);
    assert!(bank.existing_keys(tenant, &[key.clone()]).await.unwrap().is_empty());

    bank.import_line(
        tenant,
        &NewBankLine {
            line: &line,
            idempotency_key: key.clone(),
            bank_account_id: None,
            import_file: None,
        },
        Posting::None,
        &chart,
        Uuid::new_v4(),
    )
    .await
    .unwrap();

    let seen = bank.existing_keys(tenant, &[key.clone(), "other".to_string()]).await.unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen.contains(&key));
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_expense_rule_pays_expense() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;

    let expenses = ExpenseRepository::new(db.clone());
    let expense = expenses
        .create(
            tenant,
            &CreateExpenseInput {
                description: "Conta de luz".to_string(),
                category: Some("energia".to_string()),
                account_code: chart.energy.clone(),
                amount: dec!(412.30),
                due_date: day(10),
            },
            &chart,
            user,
        )
        .await
        .unwrap();

    let reconciliation = ReconciliationRepository::new(db.clone());
    reconciliation
        .create_rule(
            tenant,
            &CreateRuleInput {
                name: "Copel".to_string(),
                pattern: "COPEL".to_string(),
                rule_type: RuleType::Expense,
                target_category: Some("energia".to_string()),
                auto_match: true,
                priority: 1,
            },
        )
        .await
        .unwrap();

    let line = StatementLine::from_signed(day(10), "PAGTO COPEL DIST", dec!(-412.00), None);
    let rules = reconciliation.active_rules(tenant).await.unwrap();
    let candidates = expenses.candidates(tenant).await.unwrap();
    let hit = apply_rules(&line, &rules, &candidates, &[]).expect("rule should match");

    let row = BankTransactionRepository::new(db.clone())
        .import_line(
            tenant,
            &NewBankLine {
                line: &line,
                idempotency_key: idempotency_key(&line),
                bank_account_id: None,
                import_file: None,
            },
            Posting::Rule(&hit),
            &chart,
            user,
        )
        .await
        .unwrap();
    assert_eq!(row.status, "reconciled");
    assert!(row.reconciled_at.is_some());

    let paid = expenses.find(tenant, expense.id).await.unwrap();
    assert_eq!(paid.status, ExpenseStatus::Paid.as_str());
    assert_eq!(paid.payment_entry_id, row.journal_entry_id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_collection_split_settles_invoices() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let a = common::new_client(&db, tenant, "Padaria Central", "11222333000181", dec!(700)).await;
    let b = common::new_client(&db, tenant, "Mercado Bom Preço", "11444777000161", dec!(300)).await;

    let invoices = InvoiceRepository::new(db.clone());
    let fee_clients = ClientRepository::new(db.clone()).fee_clients(tenant).await.unwrap();
    let february: FiscalMonth = "2025-02".parse().unwrap();
    let generated = invoices
        .generate_monthly_fees(tenant, february, &fee_clients, &chart, user)
        .await
        .unwrap();
    assert_eq!(generated.created.len(), 2);
    assert_eq!(generated.total, dec!(1000));

    let again = invoices
        .generate_monthly_fees(tenant, february, &fee_clients, &chart, user)
        .await
        .unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.already_generated, 2);

    let line = StatementLine::from_signed(day(10), "LIQUIDACAO COBRANCA COB000987", dec!(1000.00), None);
    let classification = Classifier::new()
        .unwrap()
        .classify(&line, &ClientRepository::new(db.clone()).directory(tenant).await.unwrap(), &chart);
    assert!(classification.needs_split);

    let bank = BankTransactionRepository::new(db.clone());
    let row = bank
        .import_line(
            tenant,
            &NewBankLine {
                line: &line,
                idempotency_key: idempotency_key(&line),
                bank_account_id: None,
                import_file: None,
            },
            Posting::Classified(&classification),
            &chart,
            user,
        )
        .await
        .unwrap();

    let invoice_of = |client_id: Uuid| {
        generated
            .created
            .iter()
            .find(|i| i.client_id == client_id)
            .map(|i| i.id)
    };
    let requests = vec![
        SplitRequest {
            client_id: a.id,
            invoice_id: invoice_of(a.id),
            amount: dec!(700.00),
        },
        SplitRequest {
            client_id: b.id,
            invoice_id: invoice_of(b.id),
            amount: dec!(300.00),
        },
    ];
    let entry_id = bank.split(tenant, row.id, &requests, &chart, user).await.unwrap();

    for request in &requests {
        let invoice = invoices.find(tenant, request.invoice_id.unwrap()).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid.as_str());
        assert_eq!(invoice.payment_entry_id, Some(entry_id));
    }

    // A second split of the same credit is refused.
    assert!(bank.split(tenant, row.id, &requests, &chart, user).await.is_err());
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_cancel_reverses_provision() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let client = common::new_client(&db, tenant, "Padaria Central", "11222333000181", dec!(0)).await;

    let invoices = InvoiceRepository::new(db.clone());
    let invoice = invoices
        .create(
            tenant,
            &CreateInvoiceInput {
                client_id: client.id,
                competence: "2025-03".parse().unwrap(),
                description: "Serviço avulso".to_string(),
                amount: dec!(250.00),
                due_date: day(25),
                document_number: None,
                reference: None,
            },
            &chart,
            user,
        )
        .await
        .unwrap();

    let canceled = invoices
        .cancel(tenant, invoice.id, day(20), &chart, user)
        .await
        .unwrap();
    assert_eq!(canceled.status, InvoiceStatus::Canceled.as_str());
    assert!(invoices.cancel(tenant, invoice.id, day(20), &chart, user).await.is_err());
}
