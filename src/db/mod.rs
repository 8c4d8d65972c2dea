// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export database components

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod unit_of_work;

pub use postgres::*;
pub use unit_of_work::*;
