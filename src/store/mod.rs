//! Persistence contract for requests, deliveries, claims and the branch
//! directory.
//!
//! Each method is one unit of work against the datastore. Implementations
//! must apply every method atomically: in particular `try_acquire_claim` is a
//! single conditional write, and `commit_conversion` either lands both the
//! delivery insert and the request update or neither.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::AppError;
use crate::models::branch::BranchContact;
use crate::models::claim::Claim;
use crate::models::delivery::{Delivery, DeliveryFilter, NewDelivery};
use crate::models::delivery_request::{DeliveryRequest, NewDeliveryRequest, RequestFilter, RequestItem};
use crate::models::status::{DeliveryStatus, EntityKind, RequestStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum CommitOutcome {
    Committed { delivery: Delivery, request: DeliveryRequest },
    Missing,
    ClaimLost,
    NotApproved(RequestStatus),
    AlreadyConverted(i64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearedCounts {
    pub requests: u64,
    pub deliveries: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn branch_contact(&self, branch_id: i64) -> Result<Option<BranchContact>, AppError>;

    async fn insert_request(&self, new: NewDeliveryRequest) -> Result<DeliveryRequest, AppError>;

    async fn get_request(&self, id: i64) -> Result<Option<DeliveryRequest>, AppError>;

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<DeliveryRequest>, AppError>;

    /// Replaces the items of a `pending` request. `None` when the request is
    /// missing or no longer pending.
    async fn replace_pending_items(
        &self,
        id: i64,
        items: Vec<RequestItem>,
        total_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError>;

    /// Moves a request from `from` to `to`. `None` when the request is
    /// missing or its status is no longer `from`.
    async fn update_request_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError>;

    /// Sets `claim` on the request when it has no claim, the claim already
    /// belongs to the same holder, or the claim was acquired at or before
    /// `stale_before`. `None` when nothing was written.
    async fn try_acquire_claim(
        &self,
        id: i64,
        claim: &Claim,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError>;

    /// Clears the claim only if `holder_id` holds it. Returns whether a claim
    /// was cleared.
    async fn release_claim(&self, id: i64, holder_id: i64) -> Result<bool, AppError>;

    /// Creates the delivery, moves the request to `processing`, links it and
    /// clears the claim, all or nothing.
    async fn commit_conversion(
        &self,
        request_id: i64,
        holder_id: i64,
        stale_before: DateTime<Utc>,
        new: NewDelivery,
    ) -> Result<CommitOutcome, AppError>;

    async fn insert_delivery(&self, new: NewDelivery) -> Result<Delivery, AppError>;

    async fn get_delivery(&self, id: i64) -> Result<Option<Delivery>, AppError>;

    async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, AppError>;

    /// Moves a delivery from `from` to `to`. Entering `delivered` stamps
    /// `received_at` and closes a `processing` originating request in the
    /// same unit of work. `None` when missing or no longer at `from`.
    async fn update_delivery_status(
        &self,
        id: i64,
        from: DeliveryStatus,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Delivery>, AppError>;

    /// Sets `is_archived` if the entity is terminal and not yet archived.
    async fn mark_archived(&self, kind: EntityKind, id: i64, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Deletes the entity if its status is one of `allowed`.
    async fn delete_entity(&self, kind: EntityKind, id: i64, allowed: &[&'static str]) -> Result<bool, AppError>;

    /// Deletes every archived row of both kinds.
    async fn clear_archive(&self) -> Result<ClearedCounts, AppError>;
}
