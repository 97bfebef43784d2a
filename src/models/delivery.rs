use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::status::DeliveryStatus;

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub id: i64,
    pub tracking_number: String,
    pub status: DeliveryStatus,
    pub branch_id: i64,
    pub request_id: Option<i64>,
    pub recipient_name: String,
    pub recipient_address: String,
    pub recipient_phone: String,
    pub package_description: String,
    pub weight: Option<Decimal>,
    pub scheduled_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
}

/// A delivery about to be inserted. Always starts out `pending`.
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub tracking_number: String,
    pub branch_id: i64,
    pub request_id: Option<i64>,
    pub recipient_name: String,
    pub recipient_address: String,
    pub recipient_phone: String,
    pub package_description: String,
    pub weight: Option<Decimal>,
    pub scheduled_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Operator-editable fields of a delivery, as pre-filled in a draft and
/// submitted on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryFields {
    pub recipient_name: String,
    pub recipient_address: String,
    #[serde(default)]
    pub recipient_phone: String,
    pub package_description: String,
    #[serde(default)]
    pub weight: Option<Decimal>,
    pub scheduled_date: NaiveDate,
}

impl DeliveryFields {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.recipient_name.trim().is_empty() { return Err(AppError::validation("recipient_name is required")); }
        if self.recipient_address.trim().is_empty() { return Err(AppError::validation("recipient_address is required")); }
        if self.package_description.trim().is_empty() { return Err(AppError::validation("package_description is required")); }
        if self.weight.is_some_and(|w| w < Decimal::ZERO) { return Err(AppError::validation("weight cannot be negative")); }
        Ok(())
    }

    pub fn into_new(
        self,
        branch_id: i64,
        request_id: Option<i64>,
        created_by: i64,
        now: DateTime<Utc>,
    ) -> NewDelivery {
        NewDelivery {
            tracking_number: generate_tracking_number(now),
            branch_id,
            request_id,
            recipient_name: self.recipient_name.trim().to_string(),
            recipient_address: self.recipient_address.trim().to_string(),
            recipient_phone: self.recipient_phone.trim().to_string(),
            package_description: self.package_description.trim().to_string(),
            weight: self.weight,
            scheduled_date: self.scheduled_date,
            created_by: Some(created_by),
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub archived: bool,
    pub status: Option<DeliveryStatus>,
    pub branch_id: Option<i64>,
}

/// `DLV-YYYYMMDD-XXXXXXXX`
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("DLV-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tracking_numbers_carry_the_date_and_differ() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let a = generate_tracking_number(now);
        let b = generate_tracking_number(now);
        assert!(a.starts_with("DLV-20260314-"), "{a}");
        assert_eq!(a.len(), "DLV-20260314-".len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn fields_require_recipient_and_description() {
        let fields = DeliveryFields {
            recipient_name: "North Branch".into(),
            recipient_address: "12 Rizal St".into(),
            recipient_phone: String::new(),
            package_description: "3 box Rice".into(),
            weight: None,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(),
        };
        assert!(fields.validate().is_ok());

        let mut blank = fields.clone();
        blank.recipient_address = "  ".into();
        assert!(matches!(blank.validate(), Err(AppError::ValidationError(_))));

        let mut heavy = fields.clone();
        heavy.weight = Some(Decimal::NEGATIVE_ONE);
        assert!(heavy.validate().is_err());
    }
}
