//! Postgres-backed balance cache (`inventory_balances` table).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use wms_core::{SkuId, TransactionId, WarehouseId};
use wms_inventory::Balance;

use super::balance_cache::{ensure_in_scope, BalanceCache};
use crate::ledger_store::postgres::map_sqlx_error;
use crate::ledger_store::{BalanceScope, StoreError};

/// Rows per multi-row INSERT (keeps bind count well under the 65535 limit).
const INSERT_CHUNK: usize = 1000;

/// `pg_advisory_xact_lock` key shared by every `replace()`, across processes.
const REPLACE_LOCK_KEY: i64 = 0x776d_735f_6261_6c;

/// Postgres-backed balance cache.
///
/// `replace()` deletes and re-inserts a scope inside one SQL transaction, so a
/// failed rebuild leaves the previous snapshot in place. Replaces hold a
/// transaction-scoped advisory lock; under READ COMMITTED the DELETE of a
/// later replace then sees every row an earlier one committed.
#[derive(Debug, Clone)]
pub struct PostgresBalanceCache {
    pool: Arc<PgPool>,
}

impl PostgresBalanceCache {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    warehouse_id: Uuid,
    sku_id: Uuid,
    batch_lot: String,
    current_cartons: i64,
    current_units: i64,
    current_pallets: i64,
    first_receive_date: Option<DateTime<Utc>>,
    last_transaction_date: DateTime<Utc>,
    last_transaction_id: Uuid,
}

impl From<BalanceRow> for Balance {
    fn from(row: BalanceRow) -> Self {
        Balance {
            warehouse_id: WarehouseId::from_uuid(row.warehouse_id),
            sku_id: SkuId::from_uuid(row.sku_id),
            batch_lot: row.batch_lot,
            current_cartons: row.current_cartons,
            current_units: row.current_units,
            current_pallets: row.current_pallets,
            first_receive_date: row.first_receive_date,
            last_transaction_date: row.last_transaction_date,
            last_transaction_id: TransactionId::from_uuid(row.last_transaction_id),
        }
    }
}

#[async_trait]
impl BalanceCache for PostgresBalanceCache {
    #[instrument(skip(self), err)]
    async fn list(&self, scope: &BalanceScope) -> Result<Vec<Balance>, StoreError> {
        let rows: Vec<BalanceRow> = sqlx::query_as(
            r#"
            SELECT
                warehouse_id,
                sku_id,
                batch_lot,
                current_cartons,
                current_units,
                current_pallets,
                first_receive_date,
                last_transaction_date,
                last_transaction_id
            FROM inventory_balances
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::uuid IS NULL OR sku_id = $2)
            ORDER BY warehouse_id, sku_id, batch_lot
            "#,
        )
        .bind(scope.warehouse_id.map(Uuid::from))
        .bind(scope.sku_id.map(Uuid::from))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_balances", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, balances), fields(rows = balances.len()), err)]
    async fn replace(
        &self,
        warehouse_id: Option<WarehouseId>,
        balances: Vec<Balance>,
    ) -> Result<usize, StoreError> {
        ensure_in_scope(warehouse_id, &balances)?;
        let scope_uuid = warehouse_id.map(Uuid::from);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REPLACE_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_balances", e))?;

        sqlx::query("DELETE FROM inventory_balances WHERE ($1::uuid IS NULL OR warehouse_id = $1)")
            .bind(scope_uuid)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_balances", e))?;

        for chunk in balances.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                r#"
                INSERT INTO inventory_balances (
                    warehouse_id,
                    sku_id,
                    batch_lot,
                    current_cartons,
                    current_units,
                    current_pallets,
                    first_receive_date,
                    last_transaction_date,
                    last_transaction_id
                )
                "#,
            );
            qb.push_values(chunk, |mut row, b| {
                row.push_bind(*b.warehouse_id.as_uuid())
                    .push_bind(*b.sku_id.as_uuid())
                    .push_bind(b.batch_lot.clone())
                    .push_bind(b.current_cartons)
                    .push_bind(b.current_units)
                    .push_bind(b.current_pallets)
                    .push_bind(b.first_receive_date)
                    .push_bind(b.last_transaction_date)
                    .push_bind(*b.last_transaction_id.as_uuid());
            });

            // Dropping `tx` on error rolls back; the previous snapshot survives.
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_balances", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(balances.len())
    }
}
