//! # Regatta Scheduler
//!
//! Pairing-list and boat-schedule optimization for sailing league regattas.
//!
//! Given a roster of teams, a pool of boats and a number of flights, the
//! engine produces two plans:
//!
//! - a **match matrix** deciding which teams race together in each flight, so
//!   that every pair of teams meets about equally often;
//! - a **boat schedule** assigning boats and race order on top of those
//!   pairings, keeping crews on their boats across flight boundaries and
//!   cutting shuttle trips.
//!
//! Both are found by seeded, elitist generational search, so identical inputs
//! and seed always yield the identical schedule.
//!
//! ## Key Features
//!
//! - **Fingerprinted cache**: results are keyed by a SHA-256 digest of team and
//!   boat identities, flight count and settings; repeated requests skip the search
//! - **Job lifecycle**: one dedicated worker thread per tournament, cooperative
//!   cancellation at generation boundaries, and terminal-state waiting
//! - **Live progress**: phase and best-score events over a bounded broadcast
//!   channel, exposed as server-sent events
//! - **Pluggable collaborators**: tournament store, result cache and settings
//!   presets sit behind traits
//!
//! ## Running an optimization
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use regatta_scheduler::builders::CoordinatorBuilder;
//! use regatta_scheduler::core::{Boat, Team, TournamentInputs};
//! use regatta_scheduler::infra::InMemoryTournamentStore;
//!
//! let store = Arc::new(InMemoryTournamentStore::new());
//! store.insert_tournament(1, TournamentInputs {
//!     teams: (0..8).map(|i| Team::new(format!("t{i}"), format!("Team {i}"), i)).collect(),
//!     boats: (0..4).map(|i| Boat::new(format!("b{i}"), format!("Boat {i}"), i)).collect(),
//!     flights: 3,
//!     settings: Default::default(),
//! });
//!
//! let coordinator = CoordinatorBuilder::new().store(store).build()?;
//! coordinator.start(1).await?;
//! coordinator.wait_for_terminal_async(1, Duration::from_secs(60)).await;
//! let schedule = coordinator.result(1).await?;
//! ```
//!
//! See `tests/coordinator_test.rs` for complete lifecycle scenarios.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Optimization engine, job coordinator and collaborator seams.
pub mod core;
/// Configuration models for optimizer settings and the service.
pub mod config;
/// Builders to construct the coordinator from configuration.
pub mod builders;
/// Infrastructure adapters for the cache, the tournament store and presets.
pub mod infra;
/// HTTP runtime surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
