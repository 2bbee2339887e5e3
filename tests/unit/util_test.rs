//! Tests for utility functions

use regatta_scheduler::util::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(test = "util", "tracing initialized twice");
}
