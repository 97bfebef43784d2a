use serde::{Deserialize, Serialize};

use crate::models::status::EntityKind;

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub entity_kind: EntityKind,
    pub id: i64,
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub entity_kind: EntityKind,
    pub id: i64,
    pub is_archived: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearArchiveQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize)]
pub struct ArchiveEligibility {
    pub entity_kind: EntityKind,
    pub id: i64,
    pub archivable: bool,
}
