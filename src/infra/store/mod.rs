//! Tournament store backends.

pub mod memory;

pub use memory::InMemoryTournamentStore;
