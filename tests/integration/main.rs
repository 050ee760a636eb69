//! Integration tests for Scrapeline
//!
//! These tests drive the pipeline end-to-end against wiremock HTTP servers
//! and SQLite stores.

mod common;
mod cursor_tests;
mod pipeline_tests;
mod rewrite_tests;
