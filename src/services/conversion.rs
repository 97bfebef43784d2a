//! Turning an approved request into a delivery.
//!
//! `begin` claims the request and hands back a pre-filled draft; nothing but
//! the claim is persisted until `commit`, which creates the delivery and moves
//! the request to `processing` in one unit of work. `Busy`, `ClaimLost` and
//! `InvalidState` go straight back to the operator; none of them is retried
//! here.

use chrono::Duration;
use serde::Serialize;

use crate::error::AppError;
use crate::models::claim::{ClaimStatus, Operator};
use crate::models::delivery::{Delivery, DeliveryFields};
use crate::models::delivery_request::{DeliveryRequest, RequestItem};
use crate::models::status::RequestStatus;
use crate::services::claims::ClaimManager;
use crate::store::CommitOutcome;

/// Days added to "now" when the request carries no needed-by date.
const DEFAULT_LEAD_DAYS: i64 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct ConversionDraft {
    pub request_id: i64,
    pub branch_id: i64,
    pub claim: ClaimStatus,
    pub delivery: DeliveryFields,
}

#[derive(Clone)]
pub struct ConversionWorkflow {
    claims: ClaimManager,
}

impl ConversionWorkflow {
    pub fn new(claims: ClaimManager) -> Self {
        Self { claims }
    }

    pub async fn begin(&self, request_id: i64, operator: &Operator) -> Result<ConversionDraft, AppError> {
        let current = self.claims.check(request_id).await?;
        if current.held && !current.is_held_by(operator.id) {
            return Err(AppError::Busy {
                holder_id: current.holder_id.unwrap_or_default(),
                holder: current.holder.unwrap_or_default(),
            });
        }

        let claim = self.claims.acquire(request_id, operator).await?;

        let store = self.claims.store();
        let request = match store.get_request(request_id).await? {
            Some(r) => r,
            None => {
                self.claims.release(request_id, operator.id).await?;
                return Err(AppError::not_found("Delivery request not found"));
            }
        };
        if request.status != RequestStatus::Approved || request.delivery_id.is_some() {
            self.claims.release(request_id, operator.id).await?;
            return Err(AppError::invalid_state(format!(
                "Request is {}; only approved requests can be converted",
                request.status
            )));
        }

        let delivery = self.prefill(&request).await?;
        tracing::info!(request_id, operator_id = operator.id, "conversion started");

        Ok(ConversionDraft { request_id, branch_id: request.branch_id, claim, delivery })
    }

    async fn prefill(&self, request: &DeliveryRequest) -> Result<DeliveryFields, AppError> {
        let contact = self.claims.store().branch_contact(request.branch_id).await?;
        let (recipient_name, recipient_address, recipient_phone) = match contact {
            Some(c) => (c.name, c.address, c.phone),
            None => (format!("Branch #{}", request.branch_id), String::new(), String::new()),
        };
        let scheduled_date = request
            .needed_by
            .unwrap_or_else(|| (self.claims.now() + Duration::days(DEFAULT_LEAD_DAYS)).date_naive());

        Ok(DeliveryFields {
            recipient_name,
            recipient_address,
            recipient_phone,
            package_description: describe_items(&request.items),
            weight: None,
            scheduled_date,
        })
    }

    pub async fn commit(
        &self,
        request_id: i64,
        operator: &Operator,
        fields: DeliveryFields,
    ) -> Result<Delivery, AppError> {
        fields.validate()?;

        if !self.claims.check(request_id).await?.is_held_by(operator.id) {
            return Err(AppError::ClaimLost);
        }

        let store = self.claims.store();
        let request = store
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Delivery request not found"))?;

        let now = self.claims.now();
        let new = fields.into_new(request.branch_id, Some(request_id), operator.id, now);

        // The store re-checks the claim under the same lock/transaction that
        // writes, so a lease lapsing right here still yields ClaimLost.
        match store.commit_conversion(request_id, operator.id, self.claims.stale_before(now), new).await? {
            CommitOutcome::Committed { delivery, request } => {
                tracing::info!(
                    request_id,
                    request_status = %request.status,
                    operator_id = operator.id,
                    delivery_id = delivery.id,
                    tracking_number = %delivery.tracking_number,
                    "conversion committed"
                );
                Ok(delivery)
            }
            CommitOutcome::Missing => Err(AppError::not_found("Delivery request not found")),
            CommitOutcome::ClaimLost => Err(AppError::ClaimLost),
            CommitOutcome::NotApproved(status) => {
                self.claims.release(request_id, operator.id).await?;
                Err(AppError::invalid_state(format!(
                    "Request is {status}; only approved requests can be converted"
                )))
            }
            CommitOutcome::AlreadyConverted(delivery_id) => {
                self.claims.release(request_id, operator.id).await?;
                Err(AppError::invalid_state(format!("Request already converted into delivery {delivery_id}")))
            }
        }
    }

    /// Early exit from a conversion. Always succeeds, held or not.
    pub async fn abandon(&self, request_id: i64, operator: &Operator) -> Result<(), AppError> {
        self.claims.release(request_id, operator.id).await?;
        tracing::info!(request_id, operator_id = operator.id, "conversion abandoned");
        Ok(())
    }
}

fn describe_items(items: &[RequestItem]) -> String {
    items
        .iter()
        .map(|i| {
            let name = if i.description.is_empty() { i.item_code.as_str() } else { i.description.as_str() };
            format!("{} {} {} ({})", i.quantity, i.unit, name, i.item_code)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
