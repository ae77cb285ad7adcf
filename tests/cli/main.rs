//! CLI integration tests for shard.
//!
//! These tests execute the compiled binary and verify CLI behavior including:
//! - Subcommand behavior (store, display, edit, scan)
//! - Stdin/stdout handling
//! - Exit codes
//! - Site file I/O
//! - Error handling

mod common;
mod display;
mod scan;
mod site;
mod store;
