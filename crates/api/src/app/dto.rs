use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, SkuId, TransactionId, UserId, WarehouseId};
use wms_infra::ledger_store::{BalanceScope, Pagination, TransactionFilter};
use wms_inventory::{
    Balance, BalanceSummary, NewSku, NewTransaction, NewWarehouse, TransactionMetadataPatch,
    TransactionType,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    pub code: String,
    pub name: String,
}

impl From<CreateWarehouseRequest> for NewWarehouse {
    fn from(body: CreateWarehouseRequest) -> Self {
        NewWarehouse {
            code: body.code,
            name: body.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSkuRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub default_units_per_carton: u32,
}

impl From<CreateSkuRequest> for NewSku {
    fn from(body: CreateSkuRequest) -> Self {
        NewSku {
            code: body.code,
            description: body.description,
            default_units_per_carton: body.default_units_per_carton,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordTransactionRequest {
    pub transaction_type: String,
    pub transaction_date: String, // RFC3339 or YYYY-MM-DD
    pub warehouse_id: String,
    pub sku_id: String,
    pub batch_lot: String,
    #[serde(default)]
    pub cartons_in: i64,
    #[serde(default)]
    pub cartons_out: i64,
    #[serde(default)]
    pub pallets_in: i64,
    #[serde(default)]
    pub pallets_out: i64,
    pub units_per_carton: Option<u32>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl RecordTransactionRequest {
    pub fn into_new_transaction(self, created_by: UserId) -> Result<NewTransaction, Response> {
        let transaction_type = parse_transaction_type(&self.transaction_type)?;

        Ok(NewTransaction {
            transaction_type,
            transaction_date: parse_date(&self.transaction_date)?,
            warehouse_id: errors::parse_id(&self.warehouse_id)?,
            sku_id: errors::parse_id(&self.sku_id)?,
            batch_lot: self.batch_lot,
            cartons_in: self.cartons_in,
            cartons_out: self.cartons_out,
            pallets_in: self.pallets_in,
            pallets_out: self.pallets_out,
            units_per_carton: self.units_per_carton,
            tracking_number: self.tracking_number,
            notes: self.notes,
            created_by: Some(created_by),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PatchTransactionRequest {
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl From<PatchTransactionRequest> for TransactionMetadataPatch {
    fn from(body: PatchTransactionRequest) -> Self {
        TransactionMetadataPatch {
            tracking_number: body.tracking_number,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    pub warehouse_id: Option<String>,
    pub sku_id: Option<String>,
    pub batch_lot: Option<String>,
    pub transaction_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TransactionListQuery {
    pub fn into_filter(self) -> Result<(TransactionFilter, Pagination), Response> {
        let filter = TransactionFilter {
            warehouse_id: parse_opt_id::<WarehouseId>(self.warehouse_id.as_deref())?,
            sku_id: parse_opt_id::<SkuId>(self.sku_id.as_deref())?,
            batch_lot: self.batch_lot.filter(|b| !b.trim().is_empty()),
            transaction_type: match self.transaction_type.as_deref() {
                Some(raw) => Some(parse_transaction_type(raw)?),
                None => None,
            },
            from: self.from.as_deref().map(parse_date).transpose()?,
            to: self.to.as_deref().map(parse_date).transpose()?,
        };
        Ok((filter, Pagination::new(self.limit, self.offset)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    pub warehouse_id: Option<String>,
    pub sku_id: Option<String>,
    /// `ledger` (default, folded on the fly) or `cache`.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    Ledger,
    Cache,
}

impl BalanceQuery {
    pub fn scope(&self) -> Result<BalanceScope, Response> {
        Ok(BalanceScope {
            warehouse_id: parse_opt_id(self.warehouse_id.as_deref())?,
            sku_id: parse_opt_id(self.sku_id.as_deref())?,
        })
    }

    pub fn source(&self) -> Result<BalanceSource, Response> {
        match self.source.as_deref().map(str::trim) {
            None | Some("") | Some("ledger") => Ok(BalanceSource::Ledger),
            Some("cache") => Ok(BalanceSource::Cache),
            Some(other) => Err(errors::domain_error_to_response(DomainError::validation(format!(
                "source must be one of: ledger, cache (got '{other}')"
            )))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RebuildRequest {
    pub warehouse_id: Option<String>,
}

impl RebuildRequest {
    /// An empty body means "all warehouses". Anything else must be a JSON
    /// object; it is never widened to the unscoped rebuild.
    pub fn from_body(headers: &HeaderMap, body: &Bytes) -> Result<Self, Response> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        if !is_json_content_type(headers) {
            return Err(errors::domain_error_to_response(DomainError::validation(
                "rebuild body must be sent as application/json",
            )));
        }
        Json::<Self>::from_bytes(body).map(|Json(req)| req).map_err(|rejection| {
            errors::domain_error_to_response(DomainError::validation(rejection.body_text()))
        })
    }

    pub fn warehouse_id(&self) -> Result<Option<WarehouseId>, Response> {
        parse_opt_id(self.warehouse_id.as_deref())
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub warehouse_id: WarehouseId,
    pub sku_id: SkuId,
    pub batch_lot: String,
    pub current_cartons: i64,
    pub current_units: i64,
    pub current_pallets: i64,
    pub first_receive_date: Option<DateTime<Utc>>,
    pub last_transaction_date: DateTime<Utc>,
    pub last_transaction_id: TransactionId,
    pub inventory_status: &'static str,
    pub needs_review: bool,
}

impl From<Balance> for BalanceResponse {
    fn from(b: Balance) -> Self {
        let inventory_status = b.inventory_status().as_str();
        let needs_review = b.needs_review();
        Self {
            warehouse_id: b.warehouse_id,
            sku_id: b.sku_id,
            batch_lot: b.batch_lot,
            current_cartons: b.current_cartons,
            current_units: b.current_units,
            current_pallets: b.current_pallets,
            first_receive_date: b.first_receive_date,
            last_transaction_date: b.last_transaction_date,
            last_transaction_id: b.last_transaction_id,
            inventory_status,
            needs_review,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub distinct_skus: usize,
    pub distinct_batches: usize,
    pub with_inventory: usize,
    pub out_of_stock: usize,
}

impl From<BalanceSummary> for SummaryResponse {
    fn from(s: BalanceSummary) -> Self {
        Self {
            distinct_skus: s.distinct_skus,
            distinct_batches: s.distinct_batches,
            with_inventory: s.with_inventory,
            out_of_stock: s.out_of_stock,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub source: &'static str,
    pub balances: Vec<BalanceResponse>,
    pub summary: SummaryResponse,
}

impl BalancesResponse {
    pub fn new(source: BalanceSource, balances: Vec<Balance>) -> Self {
        let summary = BalanceSummary::from_balances(&balances).into();
        Self {
            source: match source {
                BalanceSource::Ledger => "ledger",
                BalanceSource::Cache => "cache",
            },
            balances: balances.into_iter().map(Into::into).collect(),
            summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub success: bool,
    pub updated_count: usize,
    pub message: String,
}

// -------------------------
// Parsing helpers
// -------------------------

/// Accept RFC3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, Response> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            errors::domain_error_to_response(DomainError::validation(format!(
                "invalid date '{raw}' (expected RFC3339 or YYYY-MM-DD)"
            )))
        })
}

fn parse_transaction_type(raw: &str) -> Result<TransactionType, Response> {
    TransactionType::parse(&raw.trim().to_ascii_uppercase()).map_err(errors::domain_error_to_response)
}

fn parse_opt_id<T>(raw: Option<&str>) -> Result<Option<T>, Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => errors::parse_id(s).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        assert_eq!(
            parse_date("2024-05-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-05-01T10:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
        );
        assert_eq!(parse_date("May 1st").unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn balance_source_defaults_to_ledger() {
        let q = BalanceQuery::default();
        assert_eq!(q.source().unwrap(), BalanceSource::Ledger);

        let q = BalanceQuery {
            source: Some("cache".to_string()),
            ..BalanceQuery::default()
        };
        assert_eq!(q.source().unwrap(), BalanceSource::Cache);

        let q = BalanceQuery {
            source: Some("both".to_string()),
            ..BalanceQuery::default()
        };
        assert_eq!(q.source().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        headers
    }

    #[test]
    fn empty_rebuild_body_means_all_warehouses() {
        let req = RebuildRequest::from_body(&HeaderMap::new(), &Bytes::new()).unwrap();
        assert_eq!(req.warehouse_id().unwrap(), None);

        let req = RebuildRequest::from_body(&json_headers(), &Bytes::from_static(b"{}")).unwrap();
        assert_eq!(req.warehouse_id().unwrap(), None);
    }

    #[test]
    fn scoped_rebuild_body_is_parsed() {
        let id = WarehouseId::new();
        let body = Bytes::from(format!(r#"{{"warehouse_id":"{id}"}}"#));
        let req = RebuildRequest::from_body(&json_headers(), &body).unwrap();
        assert_eq!(req.warehouse_id().unwrap(), Some(id));
    }

    #[test]
    fn malformed_rebuild_bodies_are_rejected() {
        let id = WarehouseId::new();
        let scoped = Bytes::from(format!(r#"{{"warehouse_id":"{id}"}}"#));

        let mut text = HeaderMap::new();
        text.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        let err = RebuildRequest::from_body(&text, &scoped).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = RebuildRequest::from_body(&HeaderMap::new(), &scoped).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let wrong_type = Bytes::from_static(br#"{"warehouse_id":123}"#);
        let err = RebuildRequest::from_body(&json_headers(), &wrong_type).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = RebuildRequest::from_body(&json_headers(), &Bytes::from_static(b"{")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn balance_json_uses_camel_case() {
        let balance = Balance {
            warehouse_id: WarehouseId::new(),
            sku_id: SkuId::new(),
            batch_lot: "B1".to_string(),
            current_cartons: 0,
            current_units: 0,
            current_pallets: 0,
            first_receive_date: None,
            last_transaction_date: Utc::now(),
            last_transaction_id: TransactionId::new(),
        };
        let json = serde_json::to_value(BalancesResponse::new(BalanceSource::Ledger, vec![balance])).unwrap();

        let row = &json["balances"][0];
        assert_eq!(row["currentCartons"], 0);
        assert_eq!(row["inventoryStatus"], "OUT_OF_STOCK");
        assert_eq!(json["summary"]["outOfStock"], 1);
        assert_eq!(json["summary"]["distinctBatches"], 1);
    }
}
