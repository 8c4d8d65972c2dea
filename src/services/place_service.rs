// src/services/place_service.rs
// DOCUMENTATION: Business logic for places
// PURPOSE: Multi-record invariants: transactional create, cascading delete,
// deduplicated favorites, search query construction

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{UnitOfWork, UnitOfWorkFactory};
use crate::errors::ListingsError;
use crate::models::{
    CreatePlaceRequest, Place, PlaceFilter, PlaceResponse, SearchQuery, UpdatePlaceRequest,
};
use crate::services::{Geocoder, MediaStore};

pub struct PlaceService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    geocoder: Arc<dyn Geocoder>,
    media_store: Arc<dyn MediaStore>,
}

/// Roll the transaction back and hand the original error on. A failing
/// rollback is logged; the caller's error is the one that matters.
async fn abort(uow: Box<dyn UnitOfWork>, err: ListingsError) -> ListingsError {
    if let Err(rollback_err) = uow.rollback().await {
        log::error!("Rollback failed after {}: {}", err, rollback_err);
    }
    err
}

/// Parse a path segment as a place id. Structurally invalid ids behave
/// like absent places.
fn parse_place_id(raw: &str) -> Result<Uuid, ListingsError> {
    Uuid::parse_str(raw).map_err(|_| ListingsError::NotFound("place", raw.to_string()))
}

impl PlaceService {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        geocoder: Arc<dyn Geocoder>,
        media_store: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            uow_factory,
            geocoder,
            media_store,
        }
    }

    /// Create a new place.
    /// Geocoding runs before any write; the place insert and the creator's
    /// back-reference append happen in one transaction. Either both are
    /// visible afterwards or neither is.
    pub async fn create_place(
        &self,
        req: CreatePlaceRequest,
    ) -> Result<PlaceResponse, ListingsError> {
        let location = self.geocoder.resolve(&req.address).await?;

        let uow = self.uow_factory.begin().await?;

        let creator = match uow.users().find_by_id(req.creator).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(abort(
                    uow,
                    ListingsError::NotFound("user", req.creator.to_string()),
                )
                .await)
            }
            Err(e) => return Err(abort(uow, e).await),
        };

        let now = Utc::now();
        let place = Place {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            address: req.address,
            location,
            images: req.images,
            creator: creator.id,
            city: req.city,
            place_type: req.place_type,
            price: req.price,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = uow.places().insert(&place).await {
            return Err(abort(uow, e).await);
        }
        if let Err(e) = uow.users().append_place(creator.id, place.id).await {
            return Err(abort(uow, e).await);
        }

        uow.commit().await?;
        log::info!("Created place {} for user {}", place.id, creator.id);
        Ok(place.to_response())
    }

    /// Delete a place and every reference to it.
    /// The place row, the creator's back-reference and all favorites
    /// entries go in one transaction; media release runs afterwards,
    /// best-effort, once deletion is already acknowledged.
    pub async fn delete_place(
        &self,
        place_id: &str,
        requester: Uuid,
    ) -> Result<(), ListingsError> {
        let id = parse_place_id(place_id)?;

        let uow = self.uow_factory.begin().await?;

        let place = match uow.places().find_by_id(id).await {
            Ok(Some(place)) => place,
            Ok(None) => {
                return Err(abort(uow, ListingsError::NotFound("place", id.to_string())).await)
            }
            Err(e) => return Err(abort(uow, e).await),
        };

        if place.creator != requester {
            return Err(abort(
                uow,
                ListingsError::Forbidden("only the creator may delete a place".to_string()),
            )
            .await);
        }

        if let Err(e) = uow.places().delete_by_id(id).await.map(|_| ()) {
            return Err(abort(uow, e).await);
        }
        if let Err(e) = uow.users().pull_place(place.creator, id).await {
            return Err(abort(uow, e).await);
        }
        let purged = match uow.users().pull_favorite_from_all(id).await {
            Ok(purged) => purged,
            Err(e) => return Err(abort(uow, e).await),
        };

        uow.commit().await?;
        log::info!(
            "Deleted place {} (purged from {} favorites lists)",
            id,
            purged
        );

        // Storage cleanup is advisory; the record is already gone
        self.media_store.release(&place.images).await;

        Ok(())
    }

    /// Update title and description of a place. Address, location and
    /// images are immutable via this path.
    pub async fn update_place(
        &self,
        place_id: &str,
        req: UpdatePlaceRequest,
        requester: Uuid,
    ) -> Result<PlaceResponse, ListingsError> {
        let id = parse_place_id(place_id)?;

        let uow = self.uow_factory.begin().await?;

        let mut place = match uow.places().find_by_id(id).await {
            Ok(Some(place)) => place,
            Ok(None) => {
                return Err(abort(uow, ListingsError::NotFound("place", id.to_string())).await)
            }
            Err(e) => return Err(abort(uow, e).await),
        };

        if place.creator != requester {
            return Err(abort(
                uow,
                ListingsError::Forbidden("only the creator may edit a place".to_string()),
            )
            .await);
        }

        place.title = req.title;
        place.description = req.description;
        place.updated_at = Utc::now();

        if let Err(e) = uow.places().update(&place).await {
            return Err(abort(uow, e).await);
        }

        uow.commit().await?;
        log::info!("Updated place {}", id);
        Ok(place.to_response())
    }

    /// Fetch a single place.
    pub async fn get_place(&self, place_id: &str) -> Result<PlaceResponse, ListingsError> {
        let id = parse_place_id(place_id)?;

        let uow = self.uow_factory.begin().await?;
        let found = uow.places().find_by_id(id).await;
        let _ = uow.rollback().await;

        found?
            .map(|p| p.to_response())
            .ok_or_else(|| ListingsError::NotFound("place", id.to_string()))
    }

    /// Places created by one user. Zero results are reported as not-found,
    /// matching the search convention.
    pub async fn get_places_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PlaceResponse>, ListingsError> {
        let filter = PlaceFilter {
            creator: Some(user_id),
            ..Default::default()
        };
        let places = self.find_places(&filter).await?;

        if places.is_empty() {
            return Err(ListingsError::NotFound(
                "places",
                format!("no places for user {}", user_id),
            ));
        }
        Ok(places)
    }

    /// Every place, oldest first. An empty listing is a plain success.
    pub async fn get_all_places(&self) -> Result<Vec<PlaceResponse>, ListingsError> {
        self.find_places(&PlaceFilter::default()).await
    }

    /// Every place, newest first.
    pub async fn get_newest_places(&self) -> Result<Vec<PlaceResponse>, ListingsError> {
        let filter = PlaceFilter {
            newest_first: true,
            ..Default::default()
        };
        self.find_places(&filter).await
    }

    /// Filtered search. Zero matches surface as a not-found condition, the
    /// same way single-entity misses do (kept from the reference behavior;
    /// see DESIGN.md).
    pub async fn search(&self, query: SearchQuery) -> Result<Vec<PlaceResponse>, ListingsError> {
        let filter = query.into_filter();
        let places = self.find_places(&filter).await?;

        if places.is_empty() {
            return Err(ListingsError::NotFound(
                "places",
                "no places match the given filters".to_string(),
            ));
        }
        Ok(places)
    }

    async fn find_places(
        &self,
        filter: &PlaceFilter,
    ) -> Result<Vec<PlaceResponse>, ListingsError> {
        let uow = self.uow_factory.begin().await?;
        let found = uow.places().find(filter).await;
        let _ = uow.rollback().await;

        Ok(found?.into_iter().map(|p| p.to_response()).collect())
    }

    /// Mark a place as a favorite of a user. Idempotent: favoriting an
    /// already-favorited place is a no-op. The place itself is not
    /// verified to exist.
    pub async fn add_favorite(
        &self,
        user_id: Uuid,
        place_id: &str,
    ) -> Result<Vec<Uuid>, ListingsError> {
        let id = parse_place_id(place_id)?;

        let uow = self.uow_factory.begin().await?;

        let user = match uow.users().find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(abort(uow, ListingsError::NotFound("user", user_id.to_string())).await)
            }
            Err(e) => return Err(abort(uow, e).await),
        };

        if user.has_favorite(id) {
            let _ = uow.rollback().await;
            return Ok(user.favorite_ids);
        }

        if let Err(e) = uow.users().add_favorite(user_id, id).await {
            return Err(abort(uow, e).await);
        }
        uow.commit().await?;

        let mut favorites = user.favorite_ids;
        favorites.push(id);
        Ok(favorites)
    }

    /// Unmark a favorite. Removing a place that was never favorited is a
    /// no-op, not an error.
    pub async fn remove_favorite(
        &self,
        user_id: Uuid,
        place_id: &str,
    ) -> Result<Vec<Uuid>, ListingsError> {
        let id = parse_place_id(place_id)?;

        let uow = self.uow_factory.begin().await?;

        let user = match uow.users().find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(abort(uow, ListingsError::NotFound("user", user_id.to_string())).await)
            }
            Err(e) => return Err(abort(uow, e).await),
        };

        if let Err(e) = uow.users().remove_favorite(user_id, id).await {
            return Err(abort(uow, e).await);
        }
        uow.commit().await?;

        Ok(user
            .favorite_ids
            .into_iter()
            .filter(|fav| *fav != id)
            .collect())
    }

    /// Favorites of a user, expanded to full place records in the order
    /// they were favorited. An empty list is a plain success, unlike
    /// search.
    pub async fn list_favorites(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PlaceResponse>, ListingsError> {
        let uow = self.uow_factory.begin().await?;

        let user = match uow.users().find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(abort(uow, ListingsError::NotFound("user", user_id.to_string())).await)
            }
            Err(e) => return Err(abort(uow, e).await),
        };

        let found = uow.places().find_by_ids(&user.favorite_ids).await;
        let _ = uow.rollback().await;

        let mut by_id: HashMap<Uuid, Place> =
            found?.into_iter().map(|p| (p.id, p)).collect();

        Ok(user
            .favorite_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|p| p.to_response())
            .collect())
    }
}
