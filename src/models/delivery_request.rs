use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::AppError;
use crate::models::claim::Claim;
use crate::models::status::RequestStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub item_code: String,
    pub description: String,
    pub quantity: i32,
    pub unit: String,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// An item line as submitted by a branch. Any subtotal the client sends is
/// not part of this shape and never reaches storage.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    pub item_code: String,
    #[serde(default)]
    pub description: String,
    pub quantity: i32,
    pub unit: String,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRequest {
    pub id: i64,
    pub branch_id: i64,
    pub status: RequestStatus,
    pub priority: Priority,
    pub items: Vec<RequestItem>,
    pub total_amount: Decimal,
    pub needed_by: Option<NaiveDate>,
    pub notes: Option<String>,
    pub delivery_id: Option<i64>,
    #[serde(skip)]
    pub claim: Option<Claim>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeliveryRequest {
    pub branch_id: i64,
    pub priority: Priority,
    pub items: Vec<RequestItem>,
    pub total_amount: Decimal,
    pub needed_by: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub archived: bool,
    pub status: Option<RequestStatus>,
    pub branch_id: Option<i64>,
}

/// Upper bound (exclusive) for prices and totals; matches `NUMERIC(14, 2)`.
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Validates item lines and prices them. The returned total is the only
/// total that is ever stored.
pub fn price_items(inputs: &[ItemInput]) -> Result<(Vec<RequestItem>, Decimal), AppError> {
    if inputs.is_empty() {
        return Err(AppError::validation("Request must have at least one item"));
    }

    let mut items = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.item_code.trim().is_empty() { return Err(AppError::validation("item_code is required")); }
        if input.unit.trim().is_empty() { return Err(AppError::validation("unit is required")); }
        if input.quantity <= 0 { return Err(AppError::validation("quantity must be > 0")); }
        if input.unit_price < Decimal::ZERO {
            return Err(AppError::validation("unit_price must be greater than or equal to 0"));
        }
        if input.unit_price >= MAX_AMOUNT {
            return Err(AppError::validation("unit_price is too large"));
        }

        let subtotal = Decimal::from(input.quantity)
            .checked_mul(input.unit_price)
            .map(money)
            .filter(|v| *v < MAX_AMOUNT)
            .ok_or_else(|| AppError::validation(format!("subtotal for {} is too large", input.item_code.trim())))?;
        items.push(RequestItem {
            item_code: input.item_code.trim().to_string(),
            description: input.description.trim().to_string(),
            quantity: input.quantity,
            unit: input.unit.trim().to_string(),
            unit_price: input.unit_price,
            subtotal,
        });
    }

    let total = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.subtotal))
        .map(money)
        .filter(|v| *v < MAX_AMOUNT)
        .ok_or_else(|| AppError::validation("Request total is too large"))?;
    Ok((items, total))
}

fn money(mut value: Decimal) -> Decimal {
    value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value
}
