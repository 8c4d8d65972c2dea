// src/handlers/places.rs
// DOCUMENTATION: HTTP handlers for place operations
// PURPOSE: Parse requests, call the service, return responses

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ListingsError;
use crate::models::{CreatePlaceRequest, SearchQuery, UpdatePlaceRequest};
use crate::services::PlaceService;

/// Requester identity, set by the upstream auth gateway after token
/// verification. Token handling itself is out of scope here.
fn requester_id(req: &HttpRequest) -> Result<Uuid, ListingsError> {
    req.headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ListingsError::Forbidden("missing or invalid x-user-id header".to_string()))
}

/// POST /places
/// Create a new place (images arrive as stored file paths)
pub async fn create_place(
    service: web::Data<PlaceService>,
    req: web::Json<CreatePlaceRequest>,
) -> Result<impl Responder, ListingsError> {
    if let Err(e) = req.validate() {
        return Err(ListingsError::Validation(e.to_string()));
    }

    let place = service.create_place(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(place))
}

/// GET /places/search
/// Search places with filters
pub async fn search_places(
    service: web::Data<PlaceService>,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, ListingsError> {
    let places = service.search(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(places))
}

/// GET /places/newest
pub async fn get_newest_places(
    service: web::Data<PlaceService>,
) -> Result<impl Responder, ListingsError> {
    let places = service.get_newest_places().await?;
    Ok(HttpResponse::Ok().json(places))
}

/// GET /places/all
pub async fn get_all_places(
    service: web::Data<PlaceService>,
) -> Result<impl Responder, ListingsError> {
    let places = service.get_all_places().await?;
    Ok(HttpResponse::Ok().json(places))
}

/// GET /places/{pid}
pub async fn get_place(
    service: web::Data<PlaceService>,
    path: web::Path<String>,
) -> Result<impl Responder, ListingsError> {
    let place = service.get_place(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(place))
}

/// GET /places/user/{uid}
pub async fn get_places_by_user(
    service: web::Data<PlaceService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ListingsError> {
    let places = service.get_places_by_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(places))
}

/// PATCH /places/{pid}
/// Update title/description; creator only
pub async fn update_place(
    service: web::Data<PlaceService>,
    http_req: HttpRequest,
    path: web::Path<String>,
    req: web::Json<UpdatePlaceRequest>,
) -> Result<impl Responder, ListingsError> {
    if let Err(e) = req.validate() {
        return Err(ListingsError::Validation(e.to_string()));
    }

    let requester = requester_id(&http_req)?;
    let place = service
        .update_place(&path.into_inner(), req.into_inner(), requester)
        .await?;
    Ok(HttpResponse::Ok().json(place))
}

/// DELETE /places/{pid}
/// Cascading delete; creator only
pub async fn delete_place(
    service: web::Data<PlaceService>,
    http_req: HttpRequest,
    path: web::Path<String>,
) -> Result<impl Responder, ListingsError> {
    let requester = requester_id(&http_req)?;
    service.delete_place(&path.into_inner(), requester).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Deleted place." })))
}

/// GET /places/{uid}/favorites
pub async fn list_favorites(
    service: web::Data<PlaceService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ListingsError> {
    let places = service.list_favorites(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(places))
}

/// POST /places/{uid}/favorites/{pid}
pub async fn add_favorite(
    service: web::Data<PlaceService>,
    path: web::Path<(Uuid, String)>,
) -> Result<impl Responder, ListingsError> {
    let (user_id, place_id) = path.into_inner();
    let favorites = service.add_favorite(user_id, &place_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "favorites": favorites })))
}

/// DELETE /places/{uid}/favorites/{pid}
pub async fn remove_favorite(
    service: web::Data<PlaceService>,
    path: web::Path<(Uuid, String)>,
) -> Result<impl Responder, ListingsError> {
    let (user_id, place_id) = path.into_inner();
    let favorites = service.remove_favorite(user_id, &place_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "favorites": favorites })))
}

/// Configuration for place routes
/// Literal segments are registered before the {pid} catch-all.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/places")
            .route("/search", web::get().to(search_places))
            .route("/newest", web::get().to(get_newest_places))
            .route("/all", web::get().to(get_all_places))
            .route("/user/{uid}", web::get().to(get_places_by_user))
            .route("/{uid}/favorites", web::get().to(list_favorites))
            .route("/{uid}/favorites/{pid}", web::post().to(add_favorite))
            .route("/{uid}/favorites/{pid}", web::delete().to(remove_favorite))
            .route("", web::post().to(create_place))
            .route("/{pid}", web::get().to(get_place))
            .route("/{pid}", web::patch().to(update_place))
            .route("/{pid}", web::delete().to(delete_place)),
    );
}
