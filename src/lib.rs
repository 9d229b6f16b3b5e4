//! Integration-test-only crate; see `tests/` for the actual test suites.
