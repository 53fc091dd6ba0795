//! Consolidated test modules.
//!
//! End-to-end tests that run a full retention pass against a mocked GitHub API.
