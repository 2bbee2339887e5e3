//! Result cache backends.

pub mod memory;

pub use memory::InMemoryResultCache;
