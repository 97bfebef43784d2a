pub mod branch;
pub mod claim;
pub mod delivery;
pub mod delivery_request;
pub mod status;
