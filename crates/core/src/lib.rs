//! Core business logic for Contta.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `closing` - Month-end closing evaluation and sign-off rules
//! - `ledger` - Double-entry postings and the chart of accounts
//! - `statements` - OFX, CSV, payment report and CNAB parsers
//! - `classification` - Rule-based classification with an optional advisor
//! - `reconciliation` - Matching statements, boletos, invoices and rules
//! - `reports` - Trial balance, income statement, balance sheet and ledger
//! - `billing` - Invoice/expense lifecycles and monthly fees
//! - `client` - CNPJ/CPF and client validation
//! - `webhook` - Stripe webhook verification and events

pub mod billing;
pub mod classification;
pub mod client;
pub mod closing;
pub mod digest;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod statements;
pub mod webhook;
