use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::claim::Operator;
use crate::models::delivery::Delivery;
use crate::models::delivery_request::DeliveryRequest;
use crate::models::status::{is_legal_transition, DeliveryStatus, EntityKind, RequestStatus};
use crate::store::Store;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Transitioned {
    Request(DeliveryRequest),
    Delivery(Delivery),
}

/// Status writes for both entity kinds. Every change is checked against the
/// status table and applied conditionally on the status that was read, so a
/// concurrent change surfaces as `InvalidState` instead of being overwritten.
#[derive(Clone)]
pub struct StatusTransitions {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl StatusTransitions {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn transition(
        &self,
        kind: EntityKind,
        id: i64,
        new_status: &str,
        actor: &Operator,
    ) -> Result<Transitioned, AppError> {
        match kind {
            EntityKind::Request => self.transition_request(id, new_status, actor).await.map(Transitioned::Request),
            EntityKind::Delivery => {
                let current = self.load_delivery(id).await?;
                if !is_legal_transition(kind, current.status.as_ref(), new_status) {
                    return Err(AppError::invalid_transition(kind, current.status, new_status));
                }
                let to = new_status
                    .parse::<DeliveryStatus>()
                    .map_err(|_| AppError::invalid_transition(kind, current.status, new_status))?;
                self.move_delivery(current, to, actor).await.map(Transitioned::Delivery)
            }
        }
    }

    async fn transition_request(&self, id: i64, new_status: &str, actor: &Operator) -> Result<DeliveryRequest, AppError> {
        let current = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::not_found("Delivery request not found"))?;
        let from = current.status;
        if !is_legal_transition(EntityKind::Request, from.as_ref(), new_status) {
            return Err(AppError::invalid_transition(EntityKind::Request, from, new_status));
        }
        let to = new_status
            .parse::<RequestStatus>()
            .map_err(|_| AppError::invalid_transition(EntityKind::Request, from, new_status))?;

        // Processing and delivered are reached through conversion and
        // delivery completion only.
        if !from.is_manual_transition(to) {
            return Err(AppError::invalid_transition(EntityKind::Request, from, to));
        }

        let updated = self
            .store
            .update_request_status(id, from, to, self.clock.now())
            .await?
            .ok_or_else(|| AppError::invalid_state("Request changed since it was loaded; refresh and retry"))?;
        tracing::info!(request_id = id, operator_id = actor.id, %from, %to, "request status changed");
        Ok(updated)
    }

    /// Quick-advance: exactly one step along the delivery chain.
    pub async fn advance_delivery(&self, id: i64, actor: &Operator) -> Result<Delivery, AppError> {
        let current = self.load_delivery(id).await?;
        let to = current
            .status
            .next()
            .ok_or_else(|| AppError::invalid_transition(EntityKind::Delivery, current.status, "next"))?;
        self.move_delivery(current, to, actor).await
    }

    async fn load_delivery(&self, id: i64) -> Result<Delivery, AppError> {
        self.store
            .get_delivery(id)
            .await?
            .ok_or_else(|| AppError::not_found("Delivery not found"))
    }

    async fn move_delivery(&self, current: Delivery, to: DeliveryStatus, actor: &Operator) -> Result<Delivery, AppError> {
        let from = current.status;
        if !from.can_transition_to(to) {
            return Err(AppError::invalid_transition(EntityKind::Delivery, from, to));
        }

        let updated = self
            .store
            .update_delivery_status(current.id, from, to, self.clock.now())
            .await?
            .ok_or_else(|| AppError::invalid_state("Delivery changed since it was loaded; refresh and retry"))?;
        tracing::info!(delivery_id = current.id, operator_id = actor.id, %from, %to, "delivery status changed");
        if let (DeliveryStatus::Delivered, Some(request_id)) = (to, updated.request_id) {
            tracing::info!(delivery_id = current.id, request_id, "originating request closed");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{fields, operator, Fixture, BRANCH_ID};

    async fn direct_delivery(fx: &Fixture) -> Delivery {
        let new = fields("Pier 4").into_new(BRANCH_ID, None, 1, fx.clock_now());
        fx.store.insert_delivery(new).await.unwrap()
    }

    #[tokio::test]
    async fn manual_request_transitions_are_limited_to_review() {
        let fx = Fixture::new();
        let t = fx.state.transitions();
        let admin = operator(1, "root");

        let rejected = fx.pending_request().await;
        t.transition(EntityKind::Request, rejected.id, "rejected", &admin).await.unwrap();
        assert!(matches!(
            t.transition(EntityKind::Request, rejected.id, "approved", &admin).await,
            Err(AppError::InvalidTransition { .. })
        ));

        let approved = fx.approved_request().await;
        for target in ["processing", "delivered", "pending", "bogus"] {
            let err = t.transition(EntityKind::Request, approved.id, target, &admin).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition { .. }), "{target}: {err:?}");
        }
        assert!(matches!(
            t.transition(EntityKind::Request, 9_999, "approved", &admin).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn quick_advance_never_skips_and_stops_at_terminal() {
        let fx = Fixture::new();
        let t = fx.state.transitions();
        let op = operator(2, "wes");
        let d = direct_delivery(&fx).await;

        let expected = [
            DeliveryStatus::Preparing,
            DeliveryStatus::Loading,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delivered,
        ];
        for status in expected {
            assert_eq!(t.advance_delivery(d.id, &op).await.unwrap().status, status);
        }
        assert!(matches!(t.advance_delivery(d.id, &op).await, Err(AppError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn general_update_allows_forward_jumps_and_cancel_only() {
        let fx = Fixture::new();
        let t = fx.state.transitions();
        let op = operator(2, "wes");
        let d = direct_delivery(&fx).await;

        let jumped = t.transition(EntityKind::Delivery, d.id, "in_transit", &op).await.unwrap();
        assert!(matches!(jumped, Transitioned::Delivery(ref x) if x.status == DeliveryStatus::InTransit));

        assert!(matches!(
            t.transition(EntityKind::Delivery, d.id, "loading", &op).await,
            Err(AppError::InvalidTransition { .. })
        ));

        t.transition(EntityKind::Delivery, d.id, "cancelled", &op).await.unwrap();
        let cancelled = fx.store.get_delivery(d.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
        assert_eq!(cancelled.received_at, None);
        assert!(matches!(
            t.transition(EntityKind::Delivery, d.id, "delivered", &op).await,
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn delivering_a_converted_delivery_closes_its_request() {
        let fx = Fixture::new();
        let request = fx.approved_request().await;
        let op = operator(2, "wes");
        let workflow = fx.state.conversions();
        let draft = workflow.begin(request.id, &op).await.unwrap();
        let delivery = workflow.commit(request.id, &op, draft.delivery).await.unwrap();

        let t = fx.state.transitions();
        let done = t.transition(EntityKind::Delivery, delivery.id, "delivered", &op).await.unwrap();
        let Transitioned::Delivery(done) = done else { panic!("expected a delivery") };
        assert_eq!(done.received_at, Some(fx.clock_now()));

        let closed = fx.state.requests().get(request.id).await.unwrap();
        assert_eq!(closed.status, RequestStatus::Delivered);
        assert_eq!(closed.delivery_id, Some(delivery.id));
    }
}
