//! Month-end closing against a real database: evaluation, stale sign-off,
//! clearing a transitory balance, closing and reopening, and postings that
//! race a sign-off.

mod common;

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use contta_core::classification::{ClientDirectory, Classifier};
use contta_core::closing::{ClosingDecision, ClosingError, ClosingStatus, TRANSITORY_NOT_ZERO};
use contta_core::ledger::{ChartCodes, EntryDraft, EntryLine, EntryType, LedgerError};
use contta_core::statements::{StatementLine, idempotency_key};
use contta_db::entities::accounting_entries;
use contta_db::repositories::entry::post_entry;
use contta_db::repositories::{
    BankTransactionRepository, ClosingRepoError, ClosingRepository, CreateInvoiceInput,
    EntryError, EntryRepository, InvoiceRepository, NewBankLine, Posting,
};
use contta_db::rls::RlsConnection;
use contta_shared::types::FiscalMonth;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

fn january() -> FiscalMonth {
    "2025-01".parse().unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_clean_month_is_authorized_and_closes() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let client = common::new_client(&db, tenant, "Padaria Central", "11222333000181", dec!(900)).await;

    InvoiceRepository::new(db.clone())
        .create(
            tenant,
            &CreateInvoiceInput {
                client_id: client.id,
                competence: january(),
                description: "Honorários 2025-01".to_string(),
                amount: dec!(900.00),
                due_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
                document_number: Some("000123".to_string()),
                reference: None,
            },
            &chart,
            user,
        )
        .await
        .unwrap();

    let closings = ClosingRepository::new(db.clone());
    let evaluation = closings.evaluate(tenant, january(), &chart, user).await.unwrap();
    assert_eq!(evaluation.decision, ClosingDecision::Authorized);
    assert_eq!(evaluation.input_hash.len(), 64);

    let closed = closings.sign_off(tenant, january(), &chart, user).await.unwrap();
    assert_eq!(closed.status, ClosingStatus::Closed.as_str());
    assert_eq!(closed.closed_by, Some(user));

    // Closed months refuse postings and re-evaluation.
    let manual = EntryDraft::new(
        day(15),
        "Ajuste",
        EntryType::Manual,
        vec![
            EntryLine::debit(&chart.bank, dec!(10)),
            EntryLine::credit(&chart.fee_revenue, dec!(10)),
        ],
    );
    let err = EntryRepository::new(db.clone())
        .post(tenant, &manual, user)
        .await
        .unwrap_err();
    assert!(matches!(err, EntryError::Ledger(LedgerError::PeriodClosed(_))));

    let err = closings.evaluate(tenant, january(), &chart, user).await.unwrap_err();
    assert!(matches!(err, ClosingRepoError::Closing(ClosingError::AlreadyClosed(_))));

    let reopened = closings.reopen(tenant, january(), user).await.unwrap();
    assert_eq!(reopened.status, ClosingStatus::Reopened.as_str());
    EntryRepository::new(db.clone())
        .post(tenant, &manual, user)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_transitory_balance_blocks_until_reclassified() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let client = common::new_client(&db, tenant, "Mercado Bom Preço", "11444777000161", dec!(0)).await;
    let closings = ClosingRepository::new(db.clone());

    let first = closings.evaluate(tenant, january(), &chart, user).await.unwrap();
    assert_eq!(first.decision, ClosingDecision::Authorized);

    // An unidentified credit lands in transitory credits.
    let line = StatementLine::from_signed(day(20), "DEPOSITO EM DINHEIRO", dec!(350.00), None);
    let classification = Classifier::new()
        .unwrap()
        .classify(&line, &ClientDirectory::default(), &chart);
    let bank = BankTransactionRepository::new(db.clone());
    let row = bank
        .import_line(
            tenant,
            &NewBankLine {
                line: &line,
                idempotency_key: idempotency_key(&line),
                bank_account_id: None,
                import_file: Some("janeiro.ofx".to_string()),
            },
            Posting::Classified(&classification),
            &chart,
            user,
        )
        .await
        .unwrap();
    assert_eq!(row.counterpart_account.as_deref(), Some(chart.transitory_credits.as_str()));

    let err = closings.sign_off(tenant, january(), &chart, user).await.unwrap_err();
    assert!(matches!(err, ClosingRepoError::Closing(ClosingError::StaleEvaluation(_))));

    let blocked = closings.evaluate(tenant, january(), &chart, user).await.unwrap();
    assert_eq!(blocked.decision, ClosingDecision::Blocked);
    assert_eq!(blocked.must_fix[0].code, TRANSITORY_NOT_ZERO);
    assert_eq!(blocked.must_fix[0].amount, Some(dec!(-350.00)));

    bank.reclassify(tenant, row.id, &client.account_code, &chart, user)
        .await
        .unwrap();

    let cleared = closings.evaluate(tenant, january(), &chart, user).await.unwrap();
    assert_eq!(cleared.decision, ClosingDecision::Authorized);
    // Same counts and rounded balances as the first evaluation: same hash.
    assert_eq!(cleared.input_hash, first.input_hash);
    closings.sign_off(tenant, january(), &chart, user).await.unwrap();
}

fn unidentified_deposit(chart: &ChartCodes) -> EntryDraft {
    EntryDraft::new(
        day(28),
        "Depósito não identificado",
        EntryType::Manual,
        vec![
            EntryLine::debit(&chart.bank, dec!(350.00)),
            EntryLine::credit(&chart.transitory_credits, dec!(350.00)),
        ],
    )
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_sign_off_waits_for_posting_in_flight() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let closings = ClosingRepository::new(db.clone());

    let evaluation = closings.evaluate(tenant, january(), &chart, user).await.unwrap();
    assert_eq!(evaluation.decision, ClosingDecision::Authorized);

    // A posting into January is written but not yet committed.
    let rls = RlsConnection::new(&db, tenant).await.unwrap();
    post_entry(rls.transaction(), tenant, &unidentified_deposit(&chart), Some(user))
        .await
        .unwrap();

    let sign_off = tokio::spawn({
        let db = db.clone();
        let chart = chart.clone();
        async move {
            ClosingRepository::new(db)
                .sign_off(tenant, january(), &chart, user)
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!sign_off.is_finished(), "sign-off must wait for the posting");

    rls.commit().await.unwrap();
    let err = sign_off.await.unwrap().unwrap_err();
    assert!(matches!(err, ClosingRepoError::Closing(ClosingError::StaleEvaluation(_))));

    let row = closings.find(tenant, january()).await.unwrap();
    assert_eq!(row.status, ClosingStatus::Authorized.as_str());
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_posting_waits_for_sign_off_and_is_refused() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let closings = ClosingRepository::new(db.clone());
    closings.evaluate(tenant, january(), &chart, user).await.unwrap();

    // Hold the closing row as a sign-off does, then close the month.
    let closer = RlsConnection::new(&db, tenant).await.unwrap();
    closer
        .transaction()
        .execute_unprepared(&format!(
            "SELECT 1 FROM monthly_closings WHERE tenant_id = '{tenant}' AND period = '2025-01' FOR UPDATE"
        ))
        .await
        .unwrap();

    let posting = tokio::spawn({
        let db = db.clone();
        let draft = unidentified_deposit(&chart);
        async move { EntryRepository::new(db).post(tenant, &draft, user).await }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!posting.is_finished(), "posting must wait for the closing row");

    closer
        .transaction()
        .execute_unprepared(&format!(
            "UPDATE monthly_closings SET status = 'closed' WHERE tenant_id = '{tenant}' AND period = '2025-01'"
        ))
        .await
        .unwrap();
    closer.commit().await.unwrap();

    let err = posting.await.unwrap().unwrap_err();
    assert!(matches!(err, EntryError::Ledger(LedgerError::PeriodClosed(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_database_refuses_entry_in_closed_month() {
    let db = common::connect().await;
    let chart = ChartCodes::default();
    let user = Uuid::new_v4();
    let tenant = common::new_tenant(&db).await;
    let closings = ClosingRepository::new(db.clone());
    closings.evaluate(tenant, january(), &chart, user).await.unwrap();
    closings.sign_off(tenant, january(), &chart, user).await.unwrap();

    // Written without the repository checks.
    let rls = RlsConnection::new(&db, tenant).await.unwrap();
    let result = accounting_entries::ActiveModel {
        id: Set(Uuid::now_v7()),
        tenant_id: Set(tenant),
        entry_date: Set(day(31)),
        description: Set("Lançamento direto".to_string()),
        entry_type: Set("manual".to_string()),
        reference_type: Set(None),
        reference_id: Set(None),
        created_by: Set(Some(user)),
        created_at: Set(Utc::now().into()),
    }
    .insert(rls.transaction())
    .await;
    rls.rollback().await.unwrap();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Cannot post to closed period"), "{err}");
}
