use std::sync::Arc;

use crate::clock::Clock;
use crate::dtos::delivery_request::CreateDeliveryRequest;
use crate::error::AppError;
use crate::models::delivery_request::{price_items, DeliveryRequest, ItemInput, NewDeliveryRequest, RequestFilter};
use crate::models::status::RequestStatus;
use crate::store::Store;

#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl RequestService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, branch_id: i64, req: CreateDeliveryRequest) -> Result<DeliveryRequest, AppError> {
        let (items, total_amount) = price_items(&req.items)?;
        if let Some(claimed) = req.total_amount {
            if claimed != total_amount {
                tracing::debug!(branch_id, %claimed, %total_amount, "ignoring client-supplied total");
            }
        }

        let request = self
            .store
            .insert_request(NewDeliveryRequest {
                branch_id,
                priority: req.priority.unwrap_or_default(),
                items,
                total_amount,
                needed_by: req.needed_by,
                notes: req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(request_id = request.id, branch_id, total = %request.total_amount, "delivery request created");
        Ok(request)
    }

    pub async fn get(&self, id: i64) -> Result<DeliveryRequest, AppError> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::not_found("Delivery request not found"))
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<DeliveryRequest>, AppError> {
        self.store.list_requests(filter).await
    }

    /// Replaces the items of a pending request and recomputes its total.
    pub async fn replace_items(&self, id: i64, inputs: &[ItemInput]) -> Result<DeliveryRequest, AppError> {
        let (items, total_amount) = price_items(inputs)?;
        match self.store.replace_pending_items(id, items, total_amount, self.clock.now()).await? {
            Some(updated) => Ok(updated),
            None => {
                let current = self.get(id).await?;
                Err(AppError::invalid_state(format!(
                    "Request is {}; items can only change while {}",
                    current.status,
                    RequestStatus::Pending
                )))
            }
        }
    }
}
