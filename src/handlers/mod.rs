// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod health;
pub mod media;
pub mod places;
pub mod rentals;

pub use health::config as health_config;
pub use media::config as media_config;
pub use places::config as places_config;
pub use rentals::config as rentals_config;
