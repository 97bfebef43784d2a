pub mod jwt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Warehouse,
    Branch,
}

impl Role {
    /// Roles allowed to claim, convert and move deliveries along.
    pub fn is_operator(self) -> bool {
        matches!(self, Role::Admin | Role::Warehouse)
    }
}
