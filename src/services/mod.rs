// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod geocoding_client;
pub mod media_store;
pub mod place_service;

pub use geocoding_client::*;
pub use media_store::*;
pub use place_service::*;
