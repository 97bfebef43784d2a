use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::services::archive::ArchivePolicy;
use crate::services::claims::ClaimManager;
use crate::services::conversion::ConversionWorkflow;
use crate::services::deliveries::DeliveryService;
use crate::services::requests::RequestService;
use crate::services::transitions::StatusTransitions;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self { store, clock, config: Arc::new(config) }
    }

    pub fn claims(&self) -> ClaimManager {
        ClaimManager::new(self.store.clone(), self.clock.clone(), self.config.claim_lease)
    }

    pub fn conversions(&self) -> ConversionWorkflow {
        ConversionWorkflow::new(self.claims())
    }

    pub fn requests(&self) -> RequestService {
        RequestService::new(self.store.clone(), self.clock.clone())
    }

    pub fn deliveries(&self) -> DeliveryService {
        DeliveryService::new(self.store.clone(), self.clock.clone())
    }

    pub fn transitions(&self) -> StatusTransitions {
        StatusTransitions::new(self.store.clone(), self.clock.clone())
    }

    pub fn archive(&self) -> ArchivePolicy {
        ArchivePolicy::new(self.store.clone(), self.clock.clone())
    }
}
