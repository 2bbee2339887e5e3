//! Infrastructure adapters for the cache, the tournament store and settings presets.

pub mod cache;
pub mod settings;
pub mod store;

pub use cache::InMemoryResultCache;
pub use settings::SettingsRegistry;
pub use store::InMemoryTournamentStore;
