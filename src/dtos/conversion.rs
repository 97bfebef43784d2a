use serde::Deserialize;

use crate::models::delivery::DeliveryFields;
use crate::models::status::EntityKind;

#[derive(Debug, Deserialize)]
pub struct CommitConversionRequest {
    #[serde(flatten)]
    pub fields: DeliveryFields,
}

#[derive(Debug, Deserialize)]
pub struct TransitionStatusRequest {
    pub entity_kind: EntityKind,
    pub id: i64,
    pub new_status: String,
}
