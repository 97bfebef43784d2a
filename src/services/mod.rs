pub mod archive;
pub mod claims;
pub mod conversion;
pub mod deliveries;
pub mod requests;
pub mod transitions;
