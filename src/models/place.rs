// src/models/place.rs
// DOCUMENTATION: Core data structures for places
// PURPOSE: Defines all serialization/deserialization models for API and storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Geographic coordinates, resolved from the address at creation time.
/// Never recomputed afterwards: location stays consistent with the address
/// as of creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Listing category. Anything other than these two values in a search
/// filter is silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceType {
    Rent,
    Buy,
}

impl FromStr for PlaceType {
    type Err = ();

    /// Exact match only; "Rent" or "sale" do not parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rent" => Ok(PlaceType::Rent),
            "buy" => Ok(PlaceType::Buy),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PlaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceType::Rent => write!(f, "rent"),
            PlaceType::Buy => write!(f, "buy"),
        }
    }
}

/// A complete place record
/// DOCUMENTATION: Maps to the places table. `creator` is set exactly once at
/// creation and is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    /// Unique identifier (UUID v4)
    pub id: Uuid,

    /// Listing title (required, non-empty)
    pub title: String,

    /// Free-text description (min length 5)
    pub description: String,

    /// Street address the coordinates were derived from
    pub address: String,

    /// Resolved coordinates
    pub location: Coordinates,

    /// Stored image file references, in upload order, each non-empty
    pub images: Vec<String>,

    /// Owning user id
    pub creator: Uuid,

    /// City name (optional, used for filtering)
    pub city: Option<String>,

    /// rent | buy
    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,

    /// Asking price
    pub price: Option<f64>,

    /// When record was created
    pub created_at: DateTime<Utc>,

    /// When record was last modified
    pub updated_at: DateTime<Utc>,
}

impl Place {
    /// Convert Place to PlaceResponse for API
    pub fn to_response(&self) -> PlaceResponse {
        PlaceResponse {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            address: self.address.clone(),
            location: self.location,
            images: self.images.clone(),
            creator: self.creator,
            city: self.city.clone(),
            place_type: self.place_type,
            price: self.price,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn validate_images(images: &[String]) -> Result<(), ValidationError> {
    if images.iter().any(|i| i.trim().is_empty()) {
        return Err(ValidationError::new("empty_image_reference"));
    }
    Ok(())
}

/// Request DTO for creating a new place
/// DOCUMENTATION: Upload middleware has already run upstream: `images`
/// arrives as the list of stored file paths it produced.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePlaceRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 5))]
    pub description: String,

    #[validate(length(min = 1))]
    pub address: String,

    /// Owning user; the place's creator, immutable after creation
    pub creator: Uuid,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default, rename = "type")]
    pub place_type: Option<PlaceType>,

    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default)]
    #[validate(custom = "validate_images")]
    pub images: Vec<String>,
}

/// Request DTO for updating an existing place
/// DOCUMENTATION: Only title and description are mutable via this path.
/// Address, location and images are fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePlaceRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 5))]
    pub description: String,
}

/// Response DTO for API consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Coordinates,
    pub images: Vec<String>,
    pub creator: Uuid,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search query parameters
/// DOCUMENTATION: DTO for parsing the query string of GET /places/search.
/// All parameters are optional; none supplied matches everything.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Substring match against address (case-insensitive)
    pub address: Option<String>,

    /// Substring match against city (case-insensitive)
    pub city: Option<String>,

    /// "rent" or "buy"; any other value is ignored, not an error
    #[serde(rename = "type")]
    pub type_: Option<String>,

    /// Lower price bound (inclusive)
    pub min_price: Option<f64>,

    /// Upper price bound (inclusive)
    pub max_price: Option<f64>,
}

impl SearchQuery {
    /// Normalize raw query parameters into a repository filter.
    /// Blank strings, unrecognized type values and non-finite price bounds
    /// drop out here, so the repositories only ever see well-formed
    /// predicates.
    pub fn into_filter(self) -> PlaceFilter {
        PlaceFilter {
            address: self.address.filter(|s| !s.trim().is_empty()),
            city: self.city.filter(|s| !s.trim().is_empty()),
            place_type: self.type_.as_deref().and_then(|t| t.parse().ok()),
            min_price: self.min_price.filter(|p| p.is_finite()),
            max_price: self.max_price.filter(|p| p.is_finite()),
            creator: None,
            newest_first: false,
        }
    }
}

/// Normalized filter handed to PlaceRepository::find
#[derive(Debug, Clone, Default)]
pub struct PlaceFilter {
    pub address: Option<String>,
    pub city: Option<String>,
    pub place_type: Option<PlaceType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Restrict to places created by this user
    pub creator: Option<Uuid>,
    /// Order descending by creation time
    pub newest_first: bool,
}

impl PlaceFilter {
    /// True when `place` satisfies every predicate of this filter.
    /// Shared by the in-memory repository and tests; the Postgres
    /// repository compiles the same predicates to SQL.
    pub fn matches(&self, place: &Place) -> bool {
        if let Some(needle) = &self.address {
            if !place
                .address
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }

        if let Some(needle) = &self.city {
            let city = match &place.city {
                Some(c) => c.to_lowercase(),
                None => return false,
            };
            if !city.contains(&needle.to_lowercase()) {
                return false;
            }
        }

        if let Some(wanted) = self.place_type {
            if place.place_type != Some(wanted) {
                return false;
            }
        }

        if self.min_price.is_some() || self.max_price.is_some() {
            let price = match place.price {
                Some(p) => p,
                None => return false,
            };
            if let Some(min) = self.min_price {
                if price < min {
                    return false;
                }
            }
            if let Some(max) = self.max_price {
                if price > max {
                    return false;
                }
            }
        }

        if let Some(creator) = self.creator {
            if place.creator != creator {
                return false;
            }
        }

        true
    }
}
