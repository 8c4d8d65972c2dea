// src/db/memory.rs
// DOCUMENTATION: In-memory implementation of the repository contracts
// PURPOSE: Lets the service test suite exercise transactional semantics
// without a running PostgreSQL. Each unit of work operates on a clone of
// the shared state; commit publishes the clone, rollback discards it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::unit_of_work::{
    PlaceRepository, UnitOfWork, UnitOfWorkFactory, UserRepository,
};
use crate::errors::ListingsError;
use crate::models::{Place, PlaceFilter, User};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    places: HashMap<Uuid, Place>,
    users: HashMap<Uuid, User>,
    /// When set, the next append_place call fails once. Used to force the
    /// user-update step of a create to break mid-transaction.
    fail_next_place_append: bool,
}

/// Shared storage handle. Clone freely; all clones see the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Seeds a place and its creator back-reference together, keeping the
    /// fixture state consistent with the creation invariant.
    pub async fn seed_place(&self, place: Place) {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(&place.creator) {
            user.place_ids.push(place.id);
        }
        state.places.insert(place.id, place);
    }

    pub async fn place(&self, id: Uuid) -> Option<Place> {
        self.state.lock().await.places.get(&id).cloned()
    }

    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.state.lock().await.users.get(&id).cloned()
    }

    pub async fn place_count(&self) -> usize {
        self.state.lock().await.places.len()
    }

    pub async fn fail_next_place_append(&self) {
        self.state.lock().await.fail_next_place_append = true;
    }
}

struct MemoryPlaceRepository {
    working: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl PlaceRepository for MemoryPlaceRepository {
    async fn insert(&self, place: &Place) -> Result<(), ListingsError> {
        self.working
            .lock()
            .await
            .places
            .insert(place.id, place.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Place>, ListingsError> {
        Ok(self.working.lock().await.places.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Place>, ListingsError> {
        let state = self.working.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.places.get(id).cloned())
            .collect())
    }

    async fn find(&self, filter: &PlaceFilter) -> Result<Vec<Place>, ListingsError> {
        let state = self.working.lock().await;
        let mut matches: Vec<Place> = state
            .places
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        if filter.newest_first {
            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        } else {
            matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        }

        Ok(matches)
    }

    async fn update(&self, place: &Place) -> Result<(), ListingsError> {
        let mut state = self.working.lock().await;
        match state.places.get_mut(&place.id) {
            Some(stored) => {
                *stored = place.clone();
                Ok(())
            }
            None => Err(ListingsError::NotFound("place", place.id.to_string())),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, ListingsError> {
        Ok(self.working.lock().await.places.remove(&id).is_some())
    }
}

struct MemoryUserRepository {
    working: Arc<Mutex<MemoryState>>,
}

impl MemoryUserRepository {
    async fn with_user<F>(&self, user_id: Uuid, f: F) -> Result<(), ListingsError>
    where
        F: FnOnce(&mut User),
    {
        let mut state = self.working.lock().await;
        match state.users.get_mut(&user_id) {
            Some(user) => {
                f(user);
                Ok(())
            }
            None => Err(ListingsError::NotFound("user", user_id.to_string())),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ListingsError> {
        Ok(self.working.lock().await.users.get(&id).cloned())
    }

    async fn append_place(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        {
            let mut state = self.working.lock().await;
            if state.fail_next_place_append {
                state.fail_next_place_append = false;
                return Err(ListingsError::Database(
                    "injected failure: append_place".to_string(),
                ));
            }
        }
        self.with_user(user_id, |u| u.place_ids.push(place_id)).await
    }

    async fn pull_place(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.with_user(user_id, |u| u.place_ids.retain(|id| *id != place_id))
            .await
    }

    async fn add_favorite(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.with_user(user_id, |u| u.favorite_ids.push(place_id))
            .await
    }

    async fn remove_favorite(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.with_user(user_id, |u| u.favorite_ids.retain(|id| *id != place_id))
            .await
    }

    async fn pull_favorite_from_all(&self, place_id: Uuid) -> Result<u64, ListingsError> {
        let mut state = self.working.lock().await;
        let mut touched = 0;
        for user in state.users.values_mut() {
            if user.favorite_ids.contains(&place_id) {
                user.favorite_ids.retain(|id| *id != place_id);
                touched += 1;
            }
        }
        Ok(touched)
    }
}

struct MemoryUnitOfWork {
    base: Arc<Mutex<MemoryState>>,
    working: Arc<Mutex<MemoryState>>,
    place_repo: MemoryPlaceRepository,
    user_repo: MemoryUserRepository,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn places(&self) -> &dyn PlaceRepository {
        &self.place_repo
    }

    fn users(&self) -> &dyn UserRepository {
        &self.user_repo
    }

    async fn commit(self: Box<Self>) -> Result<(), ListingsError> {
        let working = self.working.lock().await.clone();
        *self.base.lock().await = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ListingsError> {
        // Working copy is simply dropped
        Ok(())
    }
}

/// Factory handing out snapshot-isolated units of work over a MemoryStore.
pub struct MemoryUnitOfWorkFactory {
    store: MemoryStore,
}

impl MemoryUnitOfWorkFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, ListingsError> {
        let snapshot = self.store.state.lock().await.clone();
        let working = Arc::new(Mutex::new(snapshot));

        Ok(Box::new(MemoryUnitOfWork {
            base: self.store.state.clone(),
            place_repo: MemoryPlaceRepository {
                working: working.clone(),
            },
            user_repo: MemoryUserRepository {
                working: working.clone(),
            },
            working,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Coordinates;

    fn sample_place(creator: Uuid) -> Place {
        Place {
            id: Uuid::new_v4(),
            title: "Test place".to_string(),
            description: "A place for tests".to_string(),
            address: "1 Test St".to_string(),
            location: Coordinates { lat: 0.0, lng: 0.0 },
            images: vec![],
            creator,
            city: None,
            place_type: None,
            price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryStore::new();
        let factory = MemoryUnitOfWorkFactory::new(store.clone());

        let uow = factory.begin().await.unwrap();
        let place = sample_place(Uuid::new_v4());
        let id = place.id;
        uow.places().insert(&place).await.unwrap();
        uow.rollback().await.unwrap();

        assert!(store.place(id).await.is_none());
    }

    #[tokio::test]
    async fn commit_publishes_staged_writes() {
        let store = MemoryStore::new();
        let factory = MemoryUnitOfWorkFactory::new(store.clone());

        let uow = factory.begin().await.unwrap();
        let place = sample_place(Uuid::new_v4());
        let id = place.id;
        uow.places().insert(&place).await.unwrap();
        uow.commit().await.unwrap();

        assert!(store.place(id).await.is_some());
    }

    #[tokio::test]
    async fn writes_are_invisible_before_commit() {
        let store = MemoryStore::new();
        let factory = MemoryUnitOfWorkFactory::new(store.clone());

        let uow = factory.begin().await.unwrap();
        let place = sample_place(Uuid::new_v4());
        let id = place.id;
        uow.places().insert(&place).await.unwrap();

        // Not yet committed: other readers see nothing
        assert!(store.place(id).await.is_none());
        uow.commit().await.unwrap();
        assert!(store.place(id).await.is_some());
    }
}
