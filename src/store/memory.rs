use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::models::branch::BranchContact;
use crate::models::claim::Claim;
use crate::models::delivery::{Delivery, DeliveryFilter, NewDelivery};
use crate::models::delivery_request::{DeliveryRequest, NewDeliveryRequest, RequestFilter, RequestItem};
use crate::models::status::{DeliveryStatus, EntityKind, RequestStatus};
use crate::store::{ClearedCounts, CommitOutcome, Store};

/// In-process store. Every trait call runs under a single lock acquisition,
/// which gives it the same atomicity the Postgres store gets from
/// conditional updates and transactions.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    branches: HashMap<i64, BranchContact>,
    requests: BTreeMap<i64, DeliveryRequest>,
    deliveries: BTreeMap<i64, Delivery>,
    next_request_id: i64,
    next_delivery_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_branch(&self, branch: BranchContact) {
        self.inner.lock().branches.insert(branch.id, branch);
    }
}

impl Tables {
    fn insert_delivery(&mut self, new: NewDelivery) -> Result<Delivery, AppError> {
        if self.deliveries.values().any(|d| d.tracking_number == new.tracking_number) {
            return Err(AppError::conflict("Tracking number already exists"));
        }
        if let Some(request_id) = new.request_id {
            if self.deliveries.values().any(|d| d.request_id == Some(request_id)) {
                return Err(AppError::conflict("Request already has a delivery"));
            }
        }

        self.next_delivery_id += 1;
        let delivery = Delivery {
            id: self.next_delivery_id,
            tracking_number: new.tracking_number,
            status: DeliveryStatus::Pending,
            branch_id: new.branch_id,
            request_id: new.request_id,
            recipient_name: new.recipient_name,
            recipient_address: new.recipient_address,
            recipient_phone: new.recipient_phone,
            package_description: new.package_description,
            weight: new.weight,
            scheduled_date: new.scheduled_date,
            created_by: new.created_by,
            created_at: new.created_at,
            updated_at: new.created_at,
            received_at: None,
            is_archived: false,
        };
        self.deliveries.insert(delivery.id, delivery.clone());
        Ok(delivery)
    }

    fn status_of(&self, kind: EntityKind, id: i64) -> Option<&'static str> {
        match kind {
            EntityKind::Request => self.requests.get(&id).map(|r| r.status.into()),
            EntityKind::Delivery => self.deliveries.get(&id).map(|d| d.status.into()),
        }
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> (DateTime<Utc>, i64)) -> Vec<T> {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn branch_contact(&self, branch_id: i64) -> Result<Option<BranchContact>, AppError> {
        Ok(self.inner.lock().branches.get(&branch_id).cloned())
    }

    async fn insert_request(&self, new: NewDeliveryRequest) -> Result<DeliveryRequest, AppError> {
        let mut t = self.inner.lock();
        t.next_request_id += 1;
        let request = DeliveryRequest {
            id: t.next_request_id,
            branch_id: new.branch_id,
            status: RequestStatus::Pending,
            priority: new.priority,
            items: new.items,
            total_amount: new.total_amount,
            needed_by: new.needed_by,
            notes: new.notes,
            delivery_id: None,
            claim: None,
            is_archived: false,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        t.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: i64) -> Result<Option<DeliveryRequest>, AppError> {
        Ok(self.inner.lock().requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<DeliveryRequest>, AppError> {
        let t = self.inner.lock();
        let rows = t
            .requests
            .values()
            .filter(|r| r.is_archived == filter.archived)
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.branch_id.map_or(true, |b| r.branch_id == b))
            .cloned()
            .collect();
        Ok(newest_first(rows, |r: &DeliveryRequest| (r.created_at, r.id)))
    }

    async fn replace_pending_items(
        &self,
        id: i64,
        items: Vec<RequestItem>,
        total_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError> {
        let mut t = self.inner.lock();
        match t.requests.get_mut(&id) {
            Some(r) if r.status == RequestStatus::Pending => {
                r.items = items;
                r.total_amount = total_amount;
                r.updated_at = now;
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_request_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError> {
        let mut t = self.inner.lock();
        match t.requests.get_mut(&id) {
            Some(r) if r.status == from => {
                r.status = to;
                r.updated_at = now;
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn try_acquire_claim(
        &self,
        id: i64,
        claim: &Claim,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<DeliveryRequest>, AppError> {
        let mut t = self.inner.lock();
        let Some(r) = t.requests.get_mut(&id) else { return Ok(None) };
        let free = match &r.claim {
            None => true,
            Some(existing) => existing.holder_id == claim.holder_id || !existing.is_live(stale_before),
        };
        if !free {
            return Ok(None);
        }
        r.claim = Some(claim.clone());
        Ok(Some(r.clone()))
    }

    async fn release_claim(&self, id: i64, holder_id: i64) -> Result<bool, AppError> {
        let mut t = self.inner.lock();
        match t.requests.get_mut(&id) {
            Some(r) if r.claim.as_ref().is_some_and(|c| c.holder_id == holder_id) => {
                r.claim = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_conversion(
        &self,
        request_id: i64,
        holder_id: i64,
        stale_before: DateTime<Utc>,
        new: NewDelivery,
    ) -> Result<CommitOutcome, AppError> {
        let mut t = self.inner.lock();
        let Some(request) = t.requests.get(&request_id) else { return Ok(CommitOutcome::Missing) };

        if !request.claim.as_ref().is_some_and(|c| c.is_held_by(holder_id, stale_before)) {
            return Ok(CommitOutcome::ClaimLost);
        }
        if request.status != RequestStatus::Approved {
            return Ok(CommitOutcome::NotApproved(request.status));
        }
        if let Some(existing) = request.delivery_id {
            return Ok(CommitOutcome::AlreadyConverted(existing));
        }

        let now = new.created_at;
        let delivery = t.insert_delivery(new)?;
        let Some(request) = t.requests.get_mut(&request_id) else { return Ok(CommitOutcome::Missing) };
        request.status = RequestStatus::Processing;
        request.delivery_id = Some(delivery.id);
        request.claim = None;
        request.updated_at = now;

        Ok(CommitOutcome::Committed { delivery, request: request.clone() })
    }

    async fn insert_delivery(&self, new: NewDelivery) -> Result<Delivery, AppError> {
        self.inner.lock().insert_delivery(new)
    }

    async fn get_delivery(&self, id: i64) -> Result<Option<Delivery>, AppError> {
        Ok(self.inner.lock().deliveries.get(&id).cloned())
    }

    async fn list_deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<Delivery>, AppError> {
        let t = self.inner.lock();
        let rows = t
            .deliveries
            .values()
            .filter(|d| d.is_archived == filter.archived)
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .filter(|d| filter.branch_id.map_or(true, |b| d.branch_id == b))
            .cloned()
            .collect();
        Ok(newest_first(rows, |d: &Delivery| (d.created_at, d.id)))
    }

    async fn update_delivery_status(
        &self,
        id: i64,
        from: DeliveryStatus,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Delivery>, AppError> {
        let mut t = self.inner.lock();
        let delivery = match t.deliveries.get_mut(&id) {
            Some(d) if d.status == from => {
                d.status = to;
                d.updated_at = now;
                if to == DeliveryStatus::Delivered {
                    d.received_at = Some(now);
                }
                d.clone()
            }
            _ => return Ok(None),
        };

        if let (DeliveryStatus::Delivered, Some(request_id)) = (to, delivery.request_id) {
            if let Some(r) = t.requests.get_mut(&request_id) {
                if r.status == RequestStatus::Processing {
                    r.status = RequestStatus::Delivered;
                    r.updated_at = now;
                }
            }
        }
        Ok(Some(delivery))
    }

    async fn mark_archived(&self, kind: EntityKind, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut t = self.inner.lock();
        match kind {
            EntityKind::Request => match t.requests.get_mut(&id) {
                Some(r) if !r.is_archived && r.status.is_terminal() => {
                    r.is_archived = true;
                    r.updated_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            },
            EntityKind::Delivery => match t.deliveries.get_mut(&id) {
                Some(d) if !d.is_archived && d.status.is_terminal() => {
                    d.is_archived = true;
                    d.updated_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    async fn delete_entity(&self, kind: EntityKind, id: i64, allowed: &[&'static str]) -> Result<bool, AppError> {
        let mut t = self.inner.lock();
        if !t.status_of(kind, id).is_some_and(|status| allowed.contains(&status)) {
            return Ok(false);
        }
        let removed = match kind {
            EntityKind::Request => t.requests.remove(&id).is_some(),
            EntityKind::Delivery => t.deliveries.remove(&id).is_some(),
        };
        Ok(removed)
    }

    async fn clear_archive(&self) -> Result<ClearedCounts, AppError> {
        let mut t = self.inner.lock();
        let before = (t.requests.len(), t.deliveries.len());
        t.requests.retain(|_, r| !r.is_archived);
        t.deliveries.retain(|_, d| !d.is_archived);
        Ok(ClearedCounts {
            requests: (before.0 - t.requests.len()) as u64,
            deliveries: (before.1 - t.deliveries.len()) as u64,
        })
    }
}
