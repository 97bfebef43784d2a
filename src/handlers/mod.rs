pub mod archive;
pub mod claim;
pub mod conversion;
pub mod delivery;
pub mod delivery_request;
