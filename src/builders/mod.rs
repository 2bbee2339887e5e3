//! Builders to construct the coordinator from configuration.

pub mod coordinator_builder;

pub use coordinator_builder::{build_coordinator, CoordinatorBuilder};
