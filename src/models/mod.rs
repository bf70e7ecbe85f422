// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod geocode;
pub mod rental;
pub mod upload;

pub use geocode::*;
pub use rental::*;
pub use upload::*;
