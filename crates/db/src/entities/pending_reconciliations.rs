//! `SeaORM` Entity for pending_reconciliations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_reconciliations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub bank_account_id: Option<Uuid>,
    pub ofx_fitid: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub ofx_amount: Decimal,
    pub ofx_date: Date,
    #[sea_orm(column_type = "Text", nullable)]
    pub ofx_description: Option<String>,
    pub cnab_reference: String,
    pub cnab_document: String,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub cnab_amount: Decimal,
    pub cnab_date: Date,
    #[sea_orm(column_type = "Decimal(Some((4, 2)))")]
    pub confidence: Decimal,
    pub invoice_id: Option<Uuid>,
    pub status: String,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id"
    )]
    Invoices,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
