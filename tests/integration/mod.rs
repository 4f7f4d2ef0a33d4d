//! Integration tests for the branchtree snapshot service

mod config_integration;
mod query_service;
mod symlink_cycles;
mod test_utils;
mod tree_determinism;
