// src/db/unit_of_work.rs
// DOCUMENTATION: Repository contracts and transaction coordination
// PURPOSE: Seam between PlaceService and the storage engine

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ListingsError;
use crate::models::{Place, PlaceFilter, User};

/// All storage operations for place records.
#[async_trait]
pub trait PlaceRepository: Send + Sync {
    async fn insert(&self, place: &Place) -> Result<(), ListingsError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Place>, ListingsError>;

    /// Fetch several places at once (favorites expansion). Missing ids are
    /// skipped, not errors; result order is unspecified.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Place>, ListingsError>;

    async fn find(&self, filter: &PlaceFilter) -> Result<Vec<Place>, ListingsError>;

    /// Persist mutable fields (title, description, updated_at).
    async fn update(&self, place: &Place) -> Result<(), ListingsError>;

    /// Returns true when a row was actually removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, ListingsError>;
}

/// All storage operations for user records. Identity fields are read-only
/// here; this service only maintains the place-reference arrays.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ListingsError>;

    /// Append a place id to the user's owned-places list.
    async fn append_place(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError>;

    /// Pull a place id out of the user's owned-places list.
    async fn pull_place(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError>;

    /// Append a place id to the user's favorites. Callers are responsible
    /// for the idempotence check; a raw append of a present id is a bug.
    async fn add_favorite(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError>;

    /// Pull a place id out of the user's favorites. Pulling a non-member
    /// is a no-op.
    async fn remove_favorite(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError>;

    /// Pull a place id out of every user's favorites. Returns the number
    /// of users that held it.
    async fn pull_favorite_from_all(&self, place_id: Uuid) -> Result<u64, ListingsError>;
}

/// One transaction scope. Every repository operation obtained through the
/// same unit of work executes inside the same transaction; nothing is
/// visible to other readers until commit, and nothing survives rollback.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn places(&self) -> &dyn PlaceRepository;

    fn users(&self) -> &dyn UserRepository;

    async fn commit(self: Box<Self>) -> Result<(), ListingsError>;

    async fn rollback(self: Box<Self>) -> Result<(), ListingsError>;
}

/// Hands out fresh transaction scopes. Injected into PlaceService so tests
/// can substitute the in-memory implementation.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, ListingsError>;
}
