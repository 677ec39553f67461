//! Canonical hashing of a closing input.
//!
//! Object keys are written in sorted order, checks are sorted by code,
//! balances by account code, and decimals always carry two places, so the
//! hash only changes when the facts change.

use contta_shared::types::round_cents;
use serde_json::{Value, json};

use crate::digest::sha256_hex;

use super::types::ClosingInput;

/// Canonical JSON value of the input.
#[must_use]
pub fn canonical_value(input: &ClosingInput) -> Value {
    let mut checks: Vec<_> = input.integrity.checks.iter().collect();
    checks.sort_by(|a, b| {
        a.code
            .cmp(&b.code)
            .then_with(|| a.violations.cmp(&b.violations))
            .then_with(|| a.description.cmp(&b.description))
    });

    let mut balances: Vec<_> = input
        .transitory_balances
        .iter()
        .map(|b| (b, round_cents(b.balance)))
        .collect();
    balances.sort_by(|(a, a_bal), (b, b_bal)| {
        a.account_code
            .cmp(&b.account_code)
            .then_with(|| a_bal.cmp(b_bal))
            .then_with(|| a.account_name.cmp(&b.account_name))
    });

    json!({
        "tenant_id": input.tenant_id.to_string(),
        "period": input.period.to_string(),
        "integrity": {
            "ok": input.integrity.ok,
            "checks": checks.iter().map(|c| json!({
                "code": c.code,
                "description": c.description,
                "violations": c.violations,
            })).collect::<Vec<_>>(),
        },
        "transitory_balances": balances.iter().map(|(b, balance)| json!({
            "account_code": b.account_code,
            "account_name": b.account_name,
            "balance": balance.to_string(),
        })).collect::<Vec<_>>(),
    })
}

/// Serializes a JSON value with object keys in sorted order and no whitespace.
#[must_use]
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Lowercase hex SHA-256 of the canonical JSON of `input`.
#[must_use]
pub fn closing_input_hash(input: &ClosingInput) -> String {
    let canonical = to_canonical_string(&canonical_value(input));
    sha256_hex(canonical.as_bytes())
}
