//! cepcache library
//!
//! This module exposes the normalizer, store, fetcher and resolver for use in
//! the binary and in integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod resolver;
