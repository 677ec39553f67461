//! Database seeder for Contta development and testing.
//!
//! Creates a demo office with the standard chart of accounts and a few
//! clients with monthly fees, so `generate-monthly` has something to bill.
//!
//! Usage: cargo run --bin seeder [office name]

use anyhow::Context;
use contta_core::client::validate_client;
use contta_db::repositories::{CreateClientInput, CreateTenantInput};
use contta_db::{ClientRepository, TenantRepository, connect_pool};
use contta_shared::AppConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Demo clients: name, CNPJ, monthly fee.
const CLIENTS: [(&str, &str, Decimal); 3] = [
    ("Padaria Pão Quente Ltda", "11222333000181", dec!(850.00)),
    ("Oficina Dois Irmãos ME", "11444777000161", dec!(1200.00)),
    ("Clínica Bem Estar S/S", "45997418000153", dec!(2350.00)),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let office = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Escritório Contábil Demo".to_string());

    println!("Connecting to database...");
    let db = connect_pool(&config.database)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding tenant and chart of accounts...");
    let (tenant, accounts) = TenantRepository::new(db.clone())
        .create_with_chart(
            &CreateTenantInput {
                name: office,
                document: None,
            },
            &config.chart,
        )
        .await?;
    println!("  tenant {} ({}) with {accounts} accounts", tenant.id, tenant.name);

    println!("Seeding clients...");
    let clients = ClientRepository::new(db);
    for (name, document, fee) in CLIENTS {
        let client = validate_client(name, document, fee)?;
        let created = clients
            .create(
                tenant.id,
                CreateClientInput {
                    client,
                    email: None,
                    phone: None,
                },
                &config.chart,
            )
            .await?;
        println!("  {} - fee {}", created.name, created.monthly_fee);
    }

    println!("Seeding complete!");
    Ok(())
}
