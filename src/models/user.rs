// src/models/user.rs
// DOCUMENTATION: User records as seen by the listings service
// PURPOSE: Reference lists a user holds over places (owned and favorited)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user record. Accounts are created and authenticated by a separate
/// subsystem; this service only reads identity fields and maintains the two
/// place-reference lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    pub email: String,

    /// Ids of places this user created. Invariant: `place.creator == id`
    /// for every entry.
    pub place_ids: Vec<Uuid>,

    /// Ids of places this user marked favorite. Invariant: no duplicates;
    /// must never reference a deleted place.
    pub favorite_ids: Vec<Uuid>,
}

impl User {
    pub fn has_favorite(&self, place_id: Uuid) -> bool {
        self.favorite_ids.contains(&place_id)
    }
}
