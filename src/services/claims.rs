//! Exclusive, time-bounded claims that serialize conversion of a request.
//!
//! Handlers are stateless, so coordination lives in the store: acquiring is a
//! single conditional write there. A claim older than the lease is ignored by
//! both `check` and `acquire`, so an operator who walks away never blocks a
//! request for longer than one lease.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::claim::{Claim, ClaimStatus, Operator};
use crate::models::delivery_request::DeliveryRequest;
use crate::store::Store;

#[derive(Clone)]
pub struct ClaimManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    lease: Duration,
}

impl ClaimManager {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, lease: Duration) -> Self {
        Self { store, clock, lease }
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Claims acquired at or before this instant are expired.
    pub(crate) fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.lease
    }

    fn status_of(&self, request: &DeliveryRequest, now: DateTime<Utc>) -> ClaimStatus {
        ClaimStatus::from_claim(request.id, request.claim.as_ref(), self.stale_before(now), self.lease)
    }

    pub async fn check(&self, request_id: i64) -> Result<ClaimStatus, AppError> {
        let now = self.now();
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Delivery request not found"))?;
        Ok(self.status_of(&request, now))
    }

    /// Takes the claim for `operator`, or renews it if they already hold it.
    /// Fails with `Busy` while someone else holds a live claim.
    pub async fn acquire(&self, request_id: i64, operator: &Operator) -> Result<ClaimStatus, AppError> {
        let now = self.now();
        let claim = Claim::new(operator, now);

        if let Some(request) = self.store.try_acquire_claim(request_id, &claim, self.stale_before(now)).await? {
            tracing::info!(request_id, operator_id = operator.id, "claim acquired");
            return Ok(self.status_of(&request, now));
        }

        // Nothing written: either the request is gone or someone else holds it.
        let current = self.check(request_id).await?;
        match (current.holder_id, current.holder) {
            (Some(holder_id), Some(holder)) => {
                tracing::info!(request_id, operator_id = operator.id, holder_id, "claim conflict");
                Err(AppError::Busy { holder_id, holder })
            }
            // The blocking claim lapsed or was released between the two calls.
            _ => Err(AppError::invalid_state("Claim changed hands; refresh and try again")),
        }
    }

    /// Clears the claim if `operator_id` holds it; otherwise does nothing.
    pub async fn release(&self, request_id: i64, operator_id: i64) -> Result<(), AppError> {
        if self.store.release_claim(request_id, operator_id).await? {
            tracing::info!(request_id, operator_id, "claim released");
        } else {
            tracing::debug!(request_id, operator_id, "release ignored, claim not held by caller");
        }
        Ok(())
    }
}
