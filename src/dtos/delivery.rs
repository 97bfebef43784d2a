use serde::Deserialize;

use crate::models::delivery::DeliveryFields;

#[derive(Debug, Deserialize)]
pub struct CreateDeliveryRequest {
    pub branch_id: i64,
    #[serde(flatten)]
    pub fields: DeliveryFields,
}
