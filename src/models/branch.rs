use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Contact fields from the branch directory, used to pre-fill delivery drafts.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BranchContact {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}
