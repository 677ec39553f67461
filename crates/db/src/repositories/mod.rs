//! Repository abstractions for data access.
//!
//! Each repository owns a pool handle and opens its own tenant-scoped
//! transactions. Free functions generic over `ConnectionTrait` let one
//! repository post entries or settle records inside another's transaction.

pub mod account;
pub mod bank_transaction;
pub mod client;
pub mod closing;
pub mod entry;
pub mod expense;
pub mod invoice;
pub mod reconciliation;
pub mod report;
pub mod subscription;
pub mod tenant;

pub use account::{AccountError, AccountFilter, AccountRepository, CreateAccountInput};
pub use bank_transaction::{
    BankLineStatus, BankTransactionRepository, BankTxFilter, BankTxRepoError, NewBankLine,
    Posting, SplitRequest,
};
pub use client::{
    ClientFilter, ClientRepoError, ClientRepository, CreateClientInput, UpdateClientInput,
};
pub use closing::{ClosingRepoError, ClosingRepository};
pub use entry::{EntryError, EntryRepository, EntryWithLines};
pub use expense::{CreateExpenseInput, ExpenseFilter, ExpenseRepoError, ExpenseRepository};
pub use invoice::{
    CreateInvoiceInput, FeeGeneration, InvoiceFilter, InvoiceRepoError, InvoiceRepository,
};
pub use reconciliation::{
    CreateRuleInput, NewPending, QueuedPairs, ReconciliationRepoError, ReconciliationRepository,
};
pub use report::{ReportRepoError, ReportRepository};
pub use subscription::{EventReceipt, SubscriptionRepository};
pub use tenant::{CreateTenantInput, TenantRepository};
