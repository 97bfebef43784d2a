use serde::Deserialize;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::delivery_request::{ItemInput, Priority};

#[derive(Debug, Deserialize)]
pub struct CreateDeliveryRequest {
    /// Only read for admins filing on behalf of a branch.
    #[serde(default)]
    pub branch_id: Option<i64>,
    pub items: Vec<ItemInput>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub needed_by: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Advisory only; the stored total is always recomputed from items.
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceItemsRequest {
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub branch_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default, rename = "override")]
    pub override_delivered: bool,
}
