//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` | Duplicate warehouse / SKU code |
//! | Database (foreign key violation) | `23503` | `Domain(NotFound)` | Ledger entry references an unknown warehouse / SKU |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` | Quantity / type constraint rejected |
//! | Database (other) | Any other | `Query` | Including the append-only trigger |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` | Connection problems |
//! | Other | N/A | `Query` | |
//!
//! Rows are decoded into `*Row` structs and converted with `TryFrom`, so a
//! malformed row surfaces as `StoreError::CorruptRow` instead of a panic.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use wms_core::{DomainError, SkuId, TransactionId, UserId, WarehouseId};
use wms_inventory::{
    NewSku, NewTransaction, NewWarehouse, Sku, Transaction, TransactionMetadataPatch,
    TransactionType, Warehouse,
};

use super::query::{BalanceScope, Pagination, TransactionFilter, TransactionPage};
use super::r#trait::{LedgerStore, StoreError};

const TRANSACTION_COLUMNS: &str = r#"
    id,
    sequence,
    transaction_type,
    transaction_date,
    warehouse_id,
    sku_id,
    batch_lot,
    cartons_in,
    cartons_out,
    pallets_in,
    pallets_out,
    units_per_carton,
    tracking_number,
    notes,
    created_at,
    created_by
"#;

/// Postgres-backed append-only ledger store.
///
/// Uses SQLx connection pool which is thread-safe (Arc + Send + Sync).
/// `sequence` is a `BIGSERIAL`, so creation order is assigned by the database.
/// A trigger rejects deletes and quantity updates on `inventory_transactions`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    code: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: WarehouseId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SkuRow {
    id: Uuid,
    code: String,
    description: String,
    default_units_per_carton: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<SkuRow> for Sku {
    type Error = StoreError;

    fn try_from(row: SkuRow) -> Result<Self, Self::Error> {
        let default_units_per_carton = u32::try_from(row.default_units_per_carton)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                StoreError::CorruptRow(format!(
                    "sku {} has invalid default_units_per_carton {}",
                    row.id, row.default_units_per_carton
                ))
            })?;

        Ok(Sku {
            id: SkuId::from_uuid(row.id),
            code: row.code,
            description: row.description,
            default_units_per_carton,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    sequence: i64,
    transaction_type: String,
    transaction_date: DateTime<Utc>,
    warehouse_id: Uuid,
    sku_id: Uuid,
    batch_lot: String,
    cartons_in: i64,
    cartons_out: i64,
    pallets_in: i64,
    pallets_out: i64,
    units_per_carton: Option<i32>,
    tracking_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::parse(&row.transaction_type)
            .map_err(|e| StoreError::CorruptRow(format!("transaction {}: {e}", row.id)))?;

        let units_per_carton = match row.units_per_carton {
            None => None,
            Some(v) => Some(u32::try_from(v).ok().filter(|v| *v > 0).ok_or_else(|| {
                StoreError::CorruptRow(format!(
                    "transaction {} has invalid units_per_carton {v}",
                    row.id
                ))
            })?),
        };

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            sequence: row.sequence,
            transaction_type,
            transaction_date: row.transaction_date,
            warehouse_id: WarehouseId::from_uuid(row.warehouse_id),
            sku_id: SkuId::from_uuid(row.sku_id),
            batch_lot: row.batch_lot,
            cartons_in: row.cartons_in,
            cartons_out: row.cartons_out,
            pallets_in: row.pallets_in,
            pallets_out: row.pallets_out,
            units_per_carton,
            tracking_number: row.tracking_number,
            notes: row.notes,
            created_at: row.created_at,
            created_by: row.created_by.map(UserId::from_uuid),
        })
    }
}

fn rows_to_transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>, StoreError> {
    rows.into_iter().map(Transaction::try_from).collect()
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &TransactionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(w) = filter.warehouse_id {
        qb.push(" AND warehouse_id = ").push_bind(*w.as_uuid());
    }
    if let Some(s) = filter.sku_id {
        qb.push(" AND sku_id = ").push_bind(*s.as_uuid());
    }
    if let Some(b) = &filter.batch_lot {
        qb.push(" AND batch_lot = ").push_bind(b.clone());
    }
    if let Some(t) = filter.transaction_type {
        qb.push(" AND transaction_type = ").push_bind(t.as_str());
    }
    if let Some(from) = filter.from {
        qb.push(" AND transaction_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND transaction_date < ").push_bind(to);
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, new), fields(code = %new.code), err)]
    async fn create_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, StoreError> {
        new.validate()?;
        let row: WarehouseRow = sqlx::query_as(
            r#"
            INSERT INTO warehouses (id, code, name)
            VALUES ($1, $2, $3)
            RETURNING id, code, name, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(new.code.trim())
        .bind(new.name.trim())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_warehouse", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self), err)]
    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        let row: Option<WarehouseRow> = sqlx::query_as(
            "SELECT id, code, name, created_at FROM warehouses WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_warehouse", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), err)]
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        let rows: Vec<WarehouseRow> = sqlx::query_as(
            "SELECT id, code, name, created_at FROM warehouses ORDER BY code ASC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_warehouses", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, new), fields(code = %new.code), err)]
    async fn create_sku(&self, new: NewSku) -> Result<Sku, StoreError> {
        new.validate()?;
        let upc = i32::try_from(new.default_units_per_carton)
            .map_err(|_| DomainError::validation("default_units_per_carton is too large"))?;

        let row: SkuRow = sqlx::query_as(
            r#"
            INSERT INTO skus (id, code, description, default_units_per_carton)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, description, default_units_per_carton, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(new.code.trim())
        .bind(&new.description)
        .bind(upc)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_sku", e))?;

        row.try_into()
    }

    #[instrument(skip(self), err)]
    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError> {
        let row: Option<SkuRow> = sqlx::query_as(
            r#"
            SELECT id, code, description, default_units_per_carton, created_at
            FROM skus
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_sku", e))?;

        row.map(Sku::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_skus(&self) -> Result<Vec<Sku>, StoreError> {
        let rows: Vec<SkuRow> = sqlx::query_as(
            r#"
            SELECT id, code, description, default_units_per_carton, created_at
            FROM skus
            ORDER BY code ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_skus", e))?;

        rows.into_iter().map(Sku::try_from).collect()
    }

    #[instrument(
        skip(self, new),
        fields(
            transaction_type = %new.transaction_type,
            warehouse_id = %new.warehouse_id,
            sku_id = %new.sku_id
        ),
        err
    )]
    async fn append_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        new.validate()?;
        let units_per_carton = new
            .units_per_carton
            .map(i32::try_from)
            .transpose()
            .map_err(|_| DomainError::validation("units_per_carton is too large"))?;

        let sql = format!(
            r#"
            INSERT INTO inventory_transactions (
                id,
                transaction_type,
                transaction_date,
                warehouse_id,
                sku_id,
                batch_lot,
                cartons_in,
                cartons_out,
                pallets_in,
                pallets_out,
                units_per_carton,
                tracking_number,
                notes,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );

        let row: TransactionRow = sqlx::query_as(&sql)
            .bind(Uuid::now_v7())
            .bind(new.transaction_type.as_str())
            .bind(new.transaction_date)
            .bind(new.warehouse_id.as_uuid())
            .bind(new.sku_id.as_uuid())
            .bind(new.batch_lot.trim())
            .bind(new.cartons_in)
            .bind(new.cartons_out)
            .bind(new.pallets_in)
            .bind(new.pallets_out)
            .bind(units_per_carton)
            .bind(&new.tracking_number)
            .bind(&new.notes)
            .bind(new.created_by.map(Uuid::from))
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("append_transaction", e))?;

        row.try_into()
    }

    #[instrument(skip(self), err)]
    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions WHERE id = $1");
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }

    #[instrument(skip(self, patch), err)]
    async fn patch_transaction(
        &self,
        id: TransactionId,
        patch: TransactionMetadataPatch,
    ) -> Result<Transaction, StoreError> {
        let sql = format!(
            r#"
            UPDATE inventory_transactions
            SET tracking_number = COALESCE($2, tracking_number),
                notes = COALESCE($3, notes)
            WHERE id = $1
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );

        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(&patch.tracking_number)
            .bind(&patch.notes)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("patch_transaction", e))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(DomainError::not_found(format!("transaction {id}")).into()),
        }
    }

    #[instrument(skip(self, filter), err)]
    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> Result<TransactionPage, StoreError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inventory_transactions");
        push_filters(&mut count_qb, filter);
        let (total,): (i64,) = count_qb
            .build_query_as()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_transactions", e))?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY transaction_date DESC, sequence DESC LIMIT ")
            .push_bind(i64::from(pagination.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(pagination.offset));

        let rows: Vec<TransactionRow> = qb
            .build_query_as()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_transactions", e))?;

        let transactions = rows_to_transactions(rows)?;
        let total = total.max(0) as u64;
        let has_more = u64::from(pagination.offset) + (transactions.len() as u64) < total;

        Ok(TransactionPage {
            transactions,
            total,
            pagination,
            has_more,
        })
    }

    #[instrument(skip(self), err)]
    async fn load_ledger(&self, scope: &BalanceScope) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM inventory_transactions
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::uuid IS NULL OR sku_id = $2)
            ORDER BY transaction_date ASC, sequence ASC
            "#
        );

        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(scope.warehouse_id.map(Uuid::from))
            .bind(scope.sku_id.map(Uuid::from))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_ledger", e))?;

        tracing::debug!(entries = rows.len(), "ledger loaded");
        rows_to_transactions(rows)
    }
}

/// Map SQLx errors to `StoreError` with operation context.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => DomainError::conflict(msg).into(),
                Some("23503") => DomainError::not_found(msg).into(),
                Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}: {err}"))
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(format!("connection failure in {operation}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::CorruptRow(format!("decode failure in {operation}: {err}"))
        }
        _ => StoreError::Query(format!("sqlx error in {operation}: {err}")),
    }
}
