// src/db/postgres.rs
// DOCUMENTATION: PostgreSQL implementation of the repository contracts
// PURPOSE: SQL for place/user records plus sqlx transaction coordination

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::unit_of_work::{
    PlaceRepository, UnitOfWork, UnitOfWorkFactory, UserRepository,
};
use crate::errors::ListingsError;
use crate::models::{Place, PlaceFilter, PlaceType, User};

/// One sqlx transaction shared by both transaction-aware repositories.
/// Taken (set to None) on commit/rollback.
type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

const PLACE_COLUMNS: &str =
    "id, title, description, address, lat, lng, images, creator, city, place_type, price, \
     created_at, updated_at";

/// Internal struct for mapping database rows to the Place model
#[derive(Debug, FromRow)]
struct PlaceRow {
    id: Uuid,
    title: String,
    description: String,
    address: String,
    lat: f64,
    lng: f64,
    images: Vec<String>,
    creator: Uuid,
    city: Option<String>,
    place_type: Option<String>,
    price: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlaceRow {
    fn to_place(self) -> Place {
        Place {
            id: self.id,
            title: self.title,
            description: self.description,
            address: self.address,
            location: crate::models::Coordinates {
                lat: self.lat,
                lng: self.lng,
            },
            images: self.images,
            creator: self.creator,
            city: self.city,
            // Unknown stored values degrade to None rather than failing
            // the whole row
            place_type: self
                .place_type
                .as_deref()
                .and_then(|t| PlaceType::from_str(t).ok()),
            price: self.price,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Internal struct for mapping database rows to the User model
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    place_ids: Vec<Uuid>,
    favorite_ids: Vec<Uuid>,
}

impl UserRow {
    fn to_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            place_ids: self.place_ids,
            favorite_ids: self.favorite_ids,
        }
    }
}

/// Escape a value for interpolation into an ILIKE pattern. Quotes are
/// doubled for the string literal; backslash and the LIKE wildcards are
/// escaped so user input matches literally ("100%" must not match "1000").
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('\'', "''")
}

/// Build the WHERE clause for a place search.
/// DOCUMENTATION: Mirrors PlaceFilter::matches — address/city are
/// case-insensitive substring matches, type is an exact match, price bounds
/// are independent and inclusive. Returns an empty string when the filter
/// has no predicates (match everything). Price bounds are known finite:
/// SearchQuery::into_filter drops non-finite values.
fn build_where_clause(filter: &PlaceFilter) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(address) = &filter.address {
        clauses.push(format!("address ILIKE '%{}%'", escape_like(address)));
    }

    if let Some(city) = &filter.city {
        clauses.push(format!("city ILIKE '%{}%'", escape_like(city)));
    }

    if let Some(place_type) = filter.place_type {
        clauses.push(format!("place_type = '{}'", place_type));
    }

    if let Some(min) = filter.min_price {
        clauses.push(format!("price >= {}", min));
    }

    if let Some(max) = filter.max_price {
        clauses.push(format!("price <= {}", max));
    }

    if let Some(creator) = filter.creator {
        clauses.push(format!("creator = '{}'", creator));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

fn db_err(context: &str, e: sqlx::Error) -> ListingsError {
    log::error!("{}: {}", context, e);
    ListingsError::Database(e.to_string())
}

/// Transaction-aware place repository
pub struct TxPlaceRepository {
    tx: SharedTx,
}

#[async_trait]
impl PlaceRepository for TxPlaceRepository {
    async fn insert(&self, place: &Place) -> Result<(), ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        sqlx::query(
            r#"
            INSERT INTO places (
                id, title, description, address, lat, lng, images,
                creator, city, place_type, price, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(place.id)
        .bind(&place.title)
        .bind(&place.description)
        .bind(&place.address)
        .bind(place.location.lat)
        .bind(place.location.lng)
        .bind(&place.images)
        .bind(place.creator)
        .bind(&place.city)
        .bind(place.place_type.map(|t| t.to_string()))
        .bind(place.price)
        .bind(place.created_at)
        .bind(place.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_err("Failed to insert place", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Place>, ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let row = sqlx::query_as::<_, PlaceRow>(&format!(
            "SELECT {} FROM places WHERE id = $1",
            PLACE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_err("Failed to fetch place", e))?;

        Ok(row.map(PlaceRow::to_place))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Place>, ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let rows = sqlx::query_as::<_, PlaceRow>(&format!(
            "SELECT {} FROM places WHERE id = ANY($1)",
            PLACE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| db_err("Failed to fetch places by ids", e))?;

        Ok(rows.into_iter().map(PlaceRow::to_place).collect())
    }

    async fn find(&self, filter: &PlaceFilter) -> Result<Vec<Place>, ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let order = if filter.newest_first {
            "ORDER BY created_at DESC"
        } else {
            "ORDER BY created_at ASC"
        };
        let sql = format!(
            "SELECT {} FROM places {} {}",
            PLACE_COLUMNS,
            build_where_clause(filter),
            order
        );
        log::debug!("Executing place search: {}", sql);

        let rows = sqlx::query_as::<_, PlaceRow>(&sql)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| db_err("Place search failed", e))?;

        Ok(rows.into_iter().map(PlaceRow::to_place).collect())
    }

    async fn update(&self, place: &Place) -> Result<(), ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let rows = sqlx::query(
            "UPDATE places SET title = $1, description = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(&place.title)
        .bind(&place.description)
        .bind(place.updated_at)
        .bind(place.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_err("Failed to update place", e))?
        .rows_affected();

        if rows == 0 {
            return Err(ListingsError::NotFound("place", place.id.to_string()));
        }

        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let rows = sqlx::query("DELETE FROM places WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| db_err("Failed to delete place", e))?
            .rows_affected();

        Ok(rows > 0)
    }
}

/// Transaction-aware user repository
pub struct TxUserRepository {
    tx: SharedTx,
}

#[async_trait]
impl UserRepository for TxUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, place_ids, favorite_ids FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_err("Failed to fetch user", e))?;

        Ok(row.map(UserRow::to_user))
    }

    async fn append_place(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.update_array(
            "UPDATE users SET place_ids = array_append(place_ids, $2) WHERE id = $1",
            user_id,
            place_id,
        )
        .await
    }

    async fn pull_place(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.update_array(
            "UPDATE users SET place_ids = array_remove(place_ids, $2) WHERE id = $1",
            user_id,
            place_id,
        )
        .await
    }

    async fn add_favorite(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.update_array(
            "UPDATE users SET favorite_ids = array_append(favorite_ids, $2) WHERE id = $1",
            user_id,
            place_id,
        )
        .await
    }

    async fn remove_favorite(&self, user_id: Uuid, place_id: Uuid) -> Result<(), ListingsError> {
        self.update_array(
            "UPDATE users SET favorite_ids = array_remove(favorite_ids, $2) WHERE id = $1",
            user_id,
            place_id,
        )
        .await
    }

    async fn pull_favorite_from_all(&self, place_id: Uuid) -> Result<u64, ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let rows = sqlx::query(
            r#"
            UPDATE users
            SET favorite_ids = array_remove(favorite_ids, $1)
            WHERE $1 = ANY(favorite_ids)
            "#,
        )
        .bind(place_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_err("Failed to purge favorites", e))?
        .rows_affected();

        Ok(rows)
    }
}

impl TxUserRepository {
    async fn update_array(
        &self,
        sql: &str,
        user_id: Uuid,
        place_id: Uuid,
    ) -> Result<(), ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = tx_mut(&mut guard)?;

        let rows = sqlx::query(sql)
            .bind(user_id)
            .bind(place_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| db_err("Failed to update user reference list", e))?
            .rows_affected();

        if rows == 0 {
            return Err(ListingsError::NotFound("user", user_id.to_string()));
        }

        Ok(())
    }
}

fn tx_mut<'a>(
    guard: &'a mut Option<Transaction<'static, Postgres>>,
) -> Result<&'a mut Transaction<'static, Postgres>, ListingsError> {
    guard
        .as_mut()
        .ok_or_else(|| ListingsError::Transaction("transaction already consumed".to_string()))
}

/// PostgreSQL unit of work
/// DOCUMENTATION: Holds one transaction and the repositories bound to it.
/// All repository calls obtained through this value run in that transaction.
pub struct PgUnitOfWork {
    tx: SharedTx,
    place_repo: TxPlaceRepository,
    user_repo: TxUserRepository,
}

impl PgUnitOfWork {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx: SharedTx = Arc::new(Mutex::new(Some(tx)));
        Self {
            place_repo: TxPlaceRepository { tx: tx.clone() },
            user_repo: TxUserRepository { tx: tx.clone() },
            tx,
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn places(&self) -> &dyn PlaceRepository {
        &self.place_repo
    }

    fn users(&self) -> &dyn UserRepository {
        &self.user_repo
    }

    async fn commit(self: Box<Self>) -> Result<(), ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| ListingsError::Transaction("transaction already consumed".into()))?;

        tx.commit().await.map_err(|e| {
            log::error!("Failed to commit transaction: {}", e);
            ListingsError::Transaction(e.to_string())
        })
    }

    async fn rollback(self: Box<Self>) -> Result<(), ListingsError> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| ListingsError::Transaction("transaction already consumed".into()))?;

        tx.rollback().await.map_err(|e| {
            log::error!("Failed to roll back transaction: {}", e);
            ListingsError::Transaction(e.to_string())
        })
    }
}

/// PostgreSQL unit of work factory
pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, ListingsError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_err("Failed to begin transaction", e))?;

        Ok(Box::new(PgUnitOfWork::new(tx)))
    }
}
