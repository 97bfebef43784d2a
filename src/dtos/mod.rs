pub mod archive;
pub mod conversion;
pub mod delivery;
pub mod delivery_request;
