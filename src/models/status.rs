//! Legal states and transitions for delivery requests and deliveries.
//!
//! Every write path that changes a status consults this module; nothing else
//! decides whether a transition is allowed.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Request,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Processing,
    Delivered,
}

impl RequestStatus {
    pub const TERMINAL: [RequestStatus; 2] = [RequestStatus::Rejected, RequestStatus::Delivered];

    pub fn can_transition_to(self, to: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, to),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Processing)
                | (Processing, Delivered)
                // claim abandoned after the request was moved on
                | (Processing, Approved)
        )
    }

    /// Transitions an operator may request directly. The rest belong to the
    /// conversion workflow and to delivery completion.
    pub fn is_manual_transition(self, to: RequestStatus) -> bool {
        self == RequestStatus::Pending && self.can_transition_to(to)
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Preparing,
    Loading,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub const TERMINAL: [DeliveryStatus; 2] = [DeliveryStatus::Delivered, DeliveryStatus::Cancelled];

    /// Position along pending → preparing → loading → in_transit → delivered.
    /// `Cancelled` sits outside the chain.
    fn rank(self) -> Option<u8> {
        match self {
            DeliveryStatus::Pending => Some(0),
            DeliveryStatus::Preparing => Some(1),
            DeliveryStatus::Loading => Some(2),
            DeliveryStatus::InTransit => Some(3),
            DeliveryStatus::Delivered => Some(4),
            DeliveryStatus::Cancelled => None,
        }
    }

    /// The single step a quick-advance moves to, if any.
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Pending => Some(DeliveryStatus::Preparing),
            DeliveryStatus::Preparing => Some(DeliveryStatus::Loading),
            DeliveryStatus::Loading => Some(DeliveryStatus::InTransit),
            DeliveryStatus::InTransit => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered | DeliveryStatus::Cancelled => None,
        }
    }

    /// Forward moves along the chain (jumps included) and cancellation from
    /// any open status. Nothing leaves a terminal status.
    pub fn can_transition_to(self, to: DeliveryStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if to == DeliveryStatus::Cancelled {
            return true;
        }
        match (self.rank(), to.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

pub fn is_legal_transition(kind: EntityKind, from: &str, to: &str) -> bool {
    match kind {
        EntityKind::Request => match (from.parse::<RequestStatus>(), to.parse::<RequestStatus>()) {
            (Ok(from), Ok(to)) => from.can_transition_to(to),
            _ => false,
        },
        EntityKind::Delivery => match (from.parse::<DeliveryStatus>(), to.parse::<DeliveryStatus>()) {
            (Ok(from), Ok(to)) => from.can_transition_to(to),
            _ => false,
        },
    }
}

pub fn is_terminal(kind: EntityKind, status: &str) -> bool {
    match kind {
        EntityKind::Request => status.parse::<RequestStatus>().map(RequestStatus::is_terminal).unwrap_or(false),
        EntityKind::Delivery => status.parse::<DeliveryStatus>().map(DeliveryStatus::is_terminal).unwrap_or(false),
    }
}

pub fn is_archivable(kind: EntityKind, status: &str, is_archived: bool) -> bool {
    !is_archived && is_terminal(kind, status)
}

/// Status names that may be archived, for conditional updates in the store.
pub fn terminal_statuses(kind: EntityKind) -> Vec<&'static str> {
    match kind {
        EntityKind::Request => RequestStatus::TERMINAL.iter().map(|s| <&'static str>::from(*s)).collect(),
        EntityKind::Delivery => DeliveryStatus::TERMINAL.iter().map(|s| <&'static str>::from(*s)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST_STATUSES: [&str; 5] = ["pending", "approved", "rejected", "processing", "delivered"];
    const DELIVERY_STATUSES: [&str; 6] = ["pending", "preparing", "loading", "in_transit", "delivered", "cancelled"];

    #[test]
    fn request_transitions_follow_the_table() {
        assert!(is_legal_transition(EntityKind::Request, "pending", "approved"));
        assert!(is_legal_transition(EntityKind::Request, "pending", "rejected"));
        assert!(is_legal_transition(EntityKind::Request, "approved", "processing"));
        assert!(is_legal_transition(EntityKind::Request, "processing", "delivered"));
        assert!(is_legal_transition(EntityKind::Request, "processing", "approved"));

        assert!(!is_legal_transition(EntityKind::Request, "pending", "processing"));
        assert!(!is_legal_transition(EntityKind::Request, "approved", "delivered"));
        assert!(!is_legal_transition(EntityKind::Request, "approved", "rejected"));
        assert!(!is_legal_transition(EntityKind::Request, "pending", "pending"));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for kind in [EntityKind::Request, EntityKind::Delivery] {
            assert!(!is_legal_transition(kind, "delivered", "pending"));
        }
        for to in REQUEST_STATUSES {
            assert!(!is_legal_transition(EntityKind::Request, "rejected", to));
            assert!(!is_legal_transition(EntityKind::Request, "delivered", to));
        }
        for to in DELIVERY_STATUSES {
            assert!(!is_legal_transition(EntityKind::Delivery, "delivered", to));
            assert!(!is_legal_transition(EntityKind::Delivery, "cancelled", to));
        }
    }

    #[test]
    fn delivery_chain_is_monotonic() {
        assert!(is_legal_transition(EntityKind::Delivery, "pending", "preparing"));
        assert!(is_legal_transition(EntityKind::Delivery, "pending", "in_transit"));
        assert!(is_legal_transition(EntityKind::Delivery, "loading", "delivered"));
        assert!(!is_legal_transition(EntityKind::Delivery, "in_transit", "loading"));
        assert!(!is_legal_transition(EntityKind::Delivery, "preparing", "pending"));

        for from in ["pending", "preparing", "loading", "in_transit"] {
            assert!(is_legal_transition(EntityKind::Delivery, from, "cancelled"));
        }
    }

    #[test]
    fn quick_advance_moves_one_step() {
        let mut status = DeliveryStatus::Pending;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            assert!(status.can_transition_to(next));
            status = next;
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                DeliveryStatus::Pending,
                DeliveryStatus::Preparing,
                DeliveryStatus::Loading,
                DeliveryStatus::InTransit,
                DeliveryStatus::Delivered,
            ]
        );
        assert_eq!(DeliveryStatus::Cancelled.next(), None);
    }

    #[test]
    fn unknown_statuses_are_never_legal() {
        assert!(!is_legal_transition(EntityKind::Request, "pending", "shipped"));
        assert!(!is_legal_transition(EntityKind::Delivery, "queued", "preparing"));
        assert!(!is_terminal(EntityKind::Delivery, "rejected"));
    }

    #[test]
    fn archivable_only_when_terminal_and_not_archived() {
        for status in REQUEST_STATUSES {
            let terminal = matches!(status, "rejected" | "delivered");
            assert_eq!(is_archivable(EntityKind::Request, status, false), terminal, "{status}");
            assert!(!is_archivable(EntityKind::Request, status, true));
        }
        for status in DELIVERY_STATUSES {
            let terminal = matches!(status, "delivered" | "cancelled");
            assert_eq!(is_archivable(EntityKind::Delivery, status, false), terminal, "{status}");
            assert!(!is_archivable(EntityKind::Delivery, status, true));
        }
    }

    #[test]
    fn manual_request_transitions_exclude_workflow_moves() {
        assert!(RequestStatus::Pending.is_manual_transition(RequestStatus::Approved));
        assert!(RequestStatus::Pending.is_manual_transition(RequestStatus::Rejected));
        assert!(!RequestStatus::Approved.is_manual_transition(RequestStatus::Processing));
        assert!(!RequestStatus::Processing.is_manual_transition(RequestStatus::Delivered));
    }

    #[test]
    fn terminal_status_names_match_wire_format() {
        assert_eq!(terminal_statuses(EntityKind::Request), vec!["rejected", "delivered"]);
        assert_eq!(terminal_statuses(EntityKind::Delivery), vec!["delivered", "cancelled"]);
        assert_eq!(DeliveryStatus::InTransit.to_string(), "in_transit");
    }
}
