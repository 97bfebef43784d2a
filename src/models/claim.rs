use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Who is acting on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub id: i64,
    pub name: String,
}

/// Exclusive, time-bounded marker on a request being converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub holder_id: i64,
    pub holder_name: String,
    pub acquired_at: DateTime<Utc>,
}

impl Claim {
    pub fn new(operator: &Operator, acquired_at: DateTime<Utc>) -> Self {
        Claim { holder_id: operator.id, holder_name: operator.name.clone(), acquired_at }
    }

    /// A claim acquired at or before `stale_before` no longer blocks anyone.
    pub fn is_live(&self, stale_before: DateTime<Utc>) -> bool {
        self.acquired_at > stale_before
    }

    pub fn is_held_by(&self, operator_id: i64, stale_before: DateTime<Utc>) -> bool {
        self.holder_id == operator_id && self.is_live(stale_before)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimStatus {
    pub request_id: i64,
    pub held: bool,
    pub holder_id: Option<i64>,
    pub holder: Option<String>,
    pub acquired_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ClaimStatus {
    pub fn from_claim(request_id: i64, claim: Option<&Claim>, stale_before: DateTime<Utc>, lease: Duration) -> Self {
        match claim.filter(|c| c.is_live(stale_before)) {
            Some(c) => ClaimStatus {
                request_id,
                held: true,
                holder_id: Some(c.holder_id),
                holder: Some(c.holder_name.clone()),
                acquired_at: Some(c.acquired_at),
                expires_at: Some(c.acquired_at + lease),
            },
            None => ClaimStatus {
                request_id,
                held: false,
                holder_id: None,
                holder: None,
                acquired_at: None,
                expires_at: None,
            },
        }
    }

    pub fn is_held_by(&self, operator_id: i64) -> bool {
        self.held && self.holder_id == Some(operator_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_claim_reports_as_free() {
        let now = Utc::now();
        let lease = Duration::minutes(5);
        let op = Operator { id: 1, name: "ana".into() };
        let claim = Claim::new(&op, now - Duration::minutes(6));

        let status = ClaimStatus::from_claim(10, Some(&claim), now - lease, lease);
        assert!(!status.held);
        assert_eq!(status.holder_id, None);

        let fresh = Claim::new(&op, now - Duration::minutes(1));
        let status = ClaimStatus::from_claim(10, Some(&fresh), now - lease, lease);
        assert!(status.is_held_by(1));
        assert_eq!(status.expires_at, Some(fresh.acquired_at + lease));
    }
}
