//! Moving finished work out of active views, and permanently removing it.
//!
//! Eligibility is always re-read from the store at the moment of the write;
//! whatever the listing showed the client is not trusted.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::status::{is_archivable, is_terminal, terminal_statuses, EntityKind};
use crate::store::{ClearedCounts, Store};

const DELIVERED: &str = "delivered";

#[derive(Clone)]
pub struct ArchivePolicy {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

struct Snapshot {
    status: &'static str,
    is_archived: bool,
}

impl ArchivePolicy {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn snapshot(&self, kind: EntityKind, id: i64) -> Result<Snapshot, AppError> {
        let found = match kind {
            EntityKind::Request => self
                .store
                .get_request(id)
                .await?
                .map(|r| Snapshot { status: r.status.into(), is_archived: r.is_archived }),
            EntityKind::Delivery => self
                .store
                .get_delivery(id)
                .await?
                .map(|d| Snapshot { status: d.status.into(), is_archived: d.is_archived }),
        };
        found.ok_or_else(|| AppError::not_found(format!("{kind} {id} not found")))
    }

    pub async fn can_archive(&self, kind: EntityKind, id: i64) -> Result<bool, AppError> {
        let snap = self.snapshot(kind, id).await?;
        Ok(is_archivable(kind, snap.status, snap.is_archived))
    }

    pub async fn archive(&self, kind: EntityKind, id: i64) -> Result<(), AppError> {
        let snap = self.snapshot(kind, id).await?;
        if snap.is_archived {
            return Err(AppError::archive_forbidden(format!("{kind} {id} is already archived")));
        }
        if !is_archivable(kind, snap.status, snap.is_archived) {
            return Err(AppError::archive_forbidden(format!(
                "{kind} {id} is still {}; only finished work can be archived",
                snap.status
            )));
        }

        if !self.store.mark_archived(kind, id, self.clock.now()).await? {
            return Err(AppError::invalid_state(format!("{kind} {id} changed since it was loaded; refresh and retry")));
        }
        tracing::info!(%kind, id, status = snap.status, "archived");
        Ok(())
    }

    /// Hard delete of a single finished record. Delivered records need an
    /// administrative override on top of that.
    pub async fn delete(&self, kind: EntityKind, id: i64, override_delivered: bool) -> Result<(), AppError> {
        let snap = self.snapshot(kind, id).await?;
        if !is_terminal(kind, snap.status) {
            return Err(AppError::archive_forbidden(format!(
                "{kind} {id} is still {}; active work cannot be deleted",
                snap.status
            )));
        }
        if snap.status == DELIVERED && !override_delivered {
            return Err(AppError::archive_forbidden(format!(
                "{kind} {id} was delivered; deleting it requires an administrative override"
            )));
        }

        let allowed: Vec<&'static str> = terminal_statuses(kind)
            .into_iter()
            .filter(|s| override_delivered || *s != DELIVERED)
            .collect();
        if !self.store.delete_entity(kind, id, &allowed).await? {
            return Err(AppError::invalid_state(format!("{kind} {id} changed since it was loaded; refresh and retry")));
        }
        tracing::warn!(%kind, id, status = snap.status, override_delivered, "deleted");
        Ok(())
    }

    /// Irreversibly deletes every archived request and delivery.
    pub async fn clear(&self, confirm: bool) -> Result<ClearedCounts, AppError> {
        if !confirm {
            return Err(AppError::validation("Clearing the archive cannot be undone; pass confirm=true"));
        }
        let counts = self.store.clear_archive().await?;
        tracing::warn!(requests = counts.requests, deliveries = counts.deliveries, "archive cleared");
        Ok(counts)
    }
}
