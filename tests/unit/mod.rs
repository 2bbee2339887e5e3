//! Unit tests for individual components

mod builders_test;
mod cache_test;
mod config_test;
mod error_test;
mod fingerprint_test;
mod store_test;
mod util_test;
