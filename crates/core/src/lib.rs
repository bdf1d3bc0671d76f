//! Core business logic for the FoodTrack notification service.

pub mod services;

pub use services::*;
