// src/handlers/health.rs
// DOCUMENTATION: Health check endpoint
// PURPOSE: Liveness probe for deployment infrastructure

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

/// GET /health
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "placehub-listings",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Configuration for health routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
