use std::sync::Arc;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::claim::Operator;
use crate::models::delivery::{Delivery, DeliveryFields, DeliveryFilter};
use crate::store::Store;

#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// A delivery with no originating request.
    pub async fn create_direct(&self, branch_id: i64, fields: DeliveryFields, actor: &Operator) -> Result<Delivery, AppError> {
        fields.validate()?;
        let delivery = self
            .store
            .insert_delivery(fields.into_new(branch_id, None, actor.id, self.clock.now()))
            .await?;
        tracing::info!(
            delivery_id = delivery.id,
            branch_id,
            operator_id = actor.id,
            tracking_number = %delivery.tracking_number,
            "delivery created"
        );
        Ok(delivery)
    }

    pub async fn get(&self, id: i64) -> Result<Delivery, AppError> {
        self.store
            .get_delivery(id)
            .await?
            .ok_or_else(|| AppError::not_found("Delivery not found"))
    }

    pub async fn list(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, AppError> {
        self.store.list_deliveries(filter).await
    }
}
