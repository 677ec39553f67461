//! `SeaORM` entities, one module per table.

pub mod accounting_entries;
pub mod accounting_entry_lines;
pub mod bank_accounts;
pub mod bank_transactions;
pub mod chart_of_accounts;
pub mod clients;
pub mod expenses;
pub mod invoices;
pub mod monthly_closings;
pub mod pending_reconciliations;
pub mod reconciliation_rules;
pub mod stripe_customers;
pub mod stripe_webhook_events;
pub mod subscriptions;
pub mod tenants;
