//! Flow module - recorder flow model, loading, filtering and browser driving

pub mod model;
pub mod loader;
pub mod filter;
pub mod driver;
pub mod browser;
pub mod page;
