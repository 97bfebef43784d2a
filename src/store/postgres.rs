use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{map_constraint, AppError};
use crate::models::branch::BranchContact;
use crate::models::claim::Claim;
use crate::models::delivery::{Delivery, DeliveryFilter, NewDelivery};
use crate::models::delivery_request::{DeliveryRequest, NewDeliveryRequest, RequestFilter, RequestItem};
use crate::models::status::{terminal_statuses, DeliveryStatus, EntityKind, RequestStatus};
use crate::store::{ClearedCounts, CommitOutcome, Store};

const REQUEST_COLUMNS: &str = "id, branch_id, status, priority, items, total_amount, needed_by, notes, delivery_id, \
     claim_holder_id, claim_holder_name, claim_acquired_at, is_archived, created_at, updated_at";

const DELIVERY_COLUMNS: &str = "id, tracking_number, status, branch_id, request_id, recipient_name, recipient_address, \
     recipient_phone, package_description, weight, scheduled_date, created_by, created_at, updated_at, received_at, is_archived";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: i64,
    branch_id: i64,
    status: String,
    priority: String,
    items: Json<Vec<RequestItem>>,
    total_amount: Decimal,
    needed_by: Option<NaiveDate>,
    notes: Option<String>,
    delivery_id: Option<i64>,
    claim_holder_id: Option<i64>,
    claim_holder_name: Option<String>,
    claim_acquired_at: Option<DateTime<Utc>>,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for DeliveryRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, AppError> {
        let claim = match (row.claim_holder_id, row.claim_acquired_at) {
            (Some(holder_id), Some(acquired_at)) => Some(Claim {
                holder_id,
                holder_name: row.claim_holder_name.unwrap_or_default(),
                acquired_at,
            }),
            _ => None,
        };
        Ok(DeliveryRequest {
            id: row.id,
            branch_id: row.branch_id,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::internal(format!("request {} has unknown status '{}'", row.id, row.status)))?,
            priority: row
                .priority
                .parse()
                .map_err(|_| AppError::internal(format!("request {} has unknown priority '{}'", row.id, row.priority)))?,
            items: row.items.0,
            total_amount: row.total_amount,
            needed_by: row.needed_by,
            notes: row.notes,
            delivery_id: row.delivery_id,
            claim,
            is_archived: row.is_archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DeliveryRow {
    id: i64,
    tracking_number: String,
    status: String,
    branch_id: i64,
    request_id: Option<i64>,
    recipient_name: String,
    recipient_address: String,
    recipient_phone: String,
    package_description: String,
    weight: Option<Decimal>,
    scheduled_date: NaiveDate,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
    is_archived: bool,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> Result<Self, AppError> {
        Ok(Delivery {
            id: row.id,
            tracking_number: row.tracking_number,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::internal(format!("delivery {} has unknown status '{}'", row.id, row.status)))?,
            branch_id: row.branch_id,
            request_id: row.request_id,
            recipient_name: row.recipient_name,
            recipient_address: row.recipient_address,
            recipient_phone: row.recipient_phone,
            package_description: row.package_description,
            weight: row.weight,
            scheduled_date: row.scheduled_date,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            received_at: row.received_at,
            is_archived: row.is_archived,
        })
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Request => "delivery_requests",
        EntityKind::Delivery => "deliveries",
    }
}

fn request_from(row: Option<RequestRow>) -> Result<Option<DeliveryRequest>, AppError> {
    row.map(DeliveryRequest::try_from).transpose()
}

fn delivery_from(row: Option<DeliveryRow>) -> Result<Option<Delivery>, AppError> {
    row.map(Delivery::try_from).transpose()
}

async fn insert_delivery_row<'e>(exec: impl PgExecutor<'e>, new: &NewDelivery) -> Result<Delivery, AppError> {
    let sql = format!(
        r#"INSERT INTO deliveries (tracking_number, branch_id, request_id, recipient_name, recipient_address,
            recipient_phone, package_description, weight, scheduled_date, created_by, created_at, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        RETURNING {DELIVERY_COLUMNS}"#
    );
    let row = sqlx::query_as::<_, DeliveryRow>(&sql)
        .bind(&new.tracking_number)
        .bind(new.branch_id)
        .bind(new.request_id)
        .bind(&new.recipient_name)
        .bind(&new.recipient_address)
        .bind(&new.recipient_phone)
        .bind(&new.package_description)
        .bind(new.weight)
        .bind(new.scheduled_date)
        .bind(new.created_by)
        .bind(new.created_at)
        .fetch_one(exec)
        .await
        .map_err(|e| map_constraint(e, "Delivery already exists for this request or tracking number", "Invalid branch_id"))?;
    Delivery::try_from(row)
}

#[async_trait]
impl Store for PgStore {
    async fn branch_contact(&self, branch_id: i64) -> Result<Option<BranchContact>, AppError> {
        let row = sqlx::query_as::<_, BranchContact>(
            r#"SELECT id, name, address, contact_phone AS phone FROM branches WHERE id = $1"#,
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_request(&self, new: NewDeliveryRequest) -> Result<DeliveryRequest, AppError> {
        let sql = format!(
            r#"INSERT INTO delivery_requests (branch_id, priority, items, total_amount, needed_by, notes, created_at, updated_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
            RETURNING {REQUEST_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(new.branch_id)
            .bind(new.priority.as_ref())
            .bind(Json(&new.items))
            .bind(new.total_amount)
            .bind(new.needed_by)
            .bind(&new.notes)
            .bind(new.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "Request already exists", "Invalid branch_id"))?;
        DeliveryRequest::try_from(row)
    }

    async fn get_request(&self, id: i64) -> Result<Option<DeliveryRequest>, AppError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM delivery_requests WHERE id = $1");
        let row = sqlx::query_as::<_, RequestRow>(&sql).bind(id).fetch_optional(&self.pool).await?;
        request_from(row)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<DeliveryRequest>, AppError> {
        let sql = format!(
            r#"SELECT {REQUEST_COLUMNS} FROM delivery_requests
            WHERE is_archived = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::BIGINT IS NULL OR branch_id = $3)
            ORDER BY created_at DESC, id DESC"#
        );
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(filter.archived)
            .bind(filter.status.map(|s| s.as_ref().to_string()))
            .bind(filter.branch_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(DeliveryRequest::try_from).collect()
    }

    async fn replace_pending_items(
        &self,
        id: i64,
        items: Vec<RequestItem>,
        total_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError> {
        let sql = format!(
            r#"UPDATE delivery_requests SET items = $2, total_amount = $3, updated_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .bind(Json(&items))
            .bind(total_amount)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        request_from(row)
    }

    async fn update_request_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError> {
        let sql = format!(
            r#"UPDATE delivery_requests SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {REQUEST_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .bind(from.as_ref())
            .bind(to.as_ref())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        request_from(row)
    }

    async fn try_acquire_claim(
        &self,
        id: i64,
        claim: &Claim,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError> {
        // Single conditional write: no window between "is it free" and "take it".
        let sql = format!(
            r#"UPDATE delivery_requests
            SET claim_holder_id = $2, claim_holder_name = $3, claim_acquired_at = $4
            WHERE id = $1
              AND (claim_holder_id IS NULL OR claim_holder_id = $2 OR claim_acquired_at <= $5)
            RETURNING {REQUEST_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .bind(claim.holder_id)
            .bind(&claim.holder_name)
            .bind(claim.acquired_at)
            .bind(stale_before)
            .fetch_optional(&self.pool)
            .await?;
        request_from(row)
    }

    async fn release_claim(&self, id: i64, holder_id: i64) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"UPDATE delivery_requests
            SET claim_holder_id = NULL, claim_holder_name = NULL, claim_acquired_at = NULL
            WHERE id = $1 AND claim_holder_id = $2"#,
        )
        .bind(id)
        .bind(holder_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn commit_conversion(
        &self,
        request_id: i64,
        holder_id: i64,
        stale_before: DateTime<Utc>,
        new: NewDelivery,
    ) -> Result<CommitOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the request row so claim, status and link are checked and
        // written against the same version.
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM delivery_requests WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, RequestRow>(&sql).bind(request_id).fetch_optional(&mut *tx).await?;
        let Some(request) = request_from(row)? else { return Ok(CommitOutcome::Missing) };

        if !request.claim.as_ref().is_some_and(|c| c.is_held_by(holder_id, stale_before)) {
            return Ok(CommitOutcome::ClaimLost);
        }
        if request.status != RequestStatus::Approved {
            return Ok(CommitOutcome::NotApproved(request.status));
        }
        if let Some(existing) = request.delivery_id {
            return Ok(CommitOutcome::AlreadyConverted(existing));
        }

        let delivery = insert_delivery_row(&mut *tx, &new).await?;

        let sql = format!(
            r#"UPDATE delivery_requests
            SET status = 'processing', delivery_id = $2, updated_at = $3,
                claim_holder_id = NULL, claim_holder_name = NULL, claim_acquired_at = NULL
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(request_id)
            .bind(delivery.id)
            .bind(new.created_at)
            .fetch_one(&mut *tx)
            .await?;
        let request = DeliveryRequest::try_from(row)?;

        tx.commit().await?;
        Ok(CommitOutcome::Committed { delivery, request })
    }

    async fn insert_delivery(&self, new: NewDelivery) -> Result<Delivery, AppError> {
        insert_delivery_row(&self.pool, &new).await
    }

    async fn get_delivery(&self, id: i64) -> Result<Option<Delivery>, AppError> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1");
        let row = sqlx::query_as::<_, DeliveryRow>(&sql).bind(id).fetch_optional(&self.pool).await?;
        delivery_from(row)
    }

    async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, AppError> {
        let sql = format!(
            r#"SELECT {DELIVERY_COLUMNS} FROM deliveries
            WHERE is_archived = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::BIGINT IS NULL OR branch_id = $3)
            ORDER BY created_at DESC, id DESC"#
        );
        let rows = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(filter.archived)
            .bind(filter.status.map(|s| s.as_ref().to_string()))
            .bind(filter.branch_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Delivery::try_from).collect()
    }

    async fn update_delivery_status(
        &self,
        id: i64,
        from: DeliveryStatus,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Delivery>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"UPDATE deliveries
            SET status = $3, updated_at = $4,
                received_at = CASE WHEN $3 = 'delivered' THEN $4 ELSE received_at END
            WHERE id = $1 AND status = $2
            RETURNING {DELIVERY_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id)
            .bind(from.as_ref())
            .bind(to.as_ref())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(delivery) = delivery_from(row)? else { return Ok(None) };

        if let (DeliveryStatus::Delivered, Some(request_id)) = (to, delivery.request_id) {
            sqlx::query(
                r#"UPDATE delivery_requests SET status = 'delivered', updated_at = $2
                WHERE id = $1 AND status = 'processing'"#,
            )
            .bind(request_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(delivery))
    }

    async fn mark_archived(&self, kind: EntityKind, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET is_archived = TRUE, updated_at = $2 WHERE id = $1 AND NOT is_archived AND status = ANY($3)",
            table(kind)
        );
        let terminal: Vec<String> = terminal_statuses(kind).into_iter().map(String::from).collect();
        let res = sqlx::query(&sql).bind(id).bind(now).bind(terminal).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_entity(&self, kind: EntityKind, id: i64, allowed: &[&'static str]) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND status = ANY($2)", table(kind));
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        let res = sqlx::query(&sql).bind(id).bind(allowed).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn clear_archive(&self) -> Result<ClearedCounts, AppError> {
        let mut tx = self.pool.begin().await?;
        let requests = sqlx::query("DELETE FROM delivery_requests WHERE is_archived")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deliveries = sqlx::query("DELETE FROM deliveries WHERE is_archived")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(ClearedCounts { requests, deliveries })
    }
}
