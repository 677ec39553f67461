//! Row-level security context.
//!
//! Tenant tables carry a policy on `app.current_tenant_id`. Every
//! multi-statement write runs inside an [`RlsConnection`], which sets that
//! variable for the lifetime of its transaction.
//!
//! ```ignore
//! use contta_db::rls::RlsConnection;
//!
//! let rls = RlsConnection::new(&db, tenant_id).await?;
//! let clients = clients::Entity::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use uuid::Uuid;

/// A transaction scoped to one tenant.
pub struct RlsConnection {
    txn: DatabaseTransaction,
    tenant_id: Uuid,
}

impl RlsConnection {
    /// Begins a transaction and runs `SET LOCAL app.current_tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the
    /// variable cannot be set.
    pub async fn new(db: &DatabaseConnection, tenant_id: Uuid) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_rls_context(&txn, tenant_id).await?;
        Ok(Self { txn, tenant_id })
    }

    /// The transaction all tenant queries go through.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Tenant this transaction is scoped to.
    #[must_use]
    pub const fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

fn set_local_sql(tenant_id: Uuid) -> String {
    // A `Uuid` renders as hex and dashes only, so interpolation is safe.
    format!("SET LOCAL app.current_tenant_id = '{tenant_id}'")
}

/// Sets the tenant on an already open transaction.
///
/// # Errors
///
/// Returns an error if the variable cannot be set.
pub async fn set_rls_context(txn: &DatabaseTransaction, tenant_id: Uuid) -> Result<(), DbErr> {
    txn.execute_unprepared(&set_local_sql(tenant_id)).await?;
    Ok(())
}
