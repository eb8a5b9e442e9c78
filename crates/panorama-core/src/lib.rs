//! Core types and trait definitions for the Panorama 360 views.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the document model, the closed table of upstream source types, change
//! notifications, the merge-by-key reducer, and the [`store::DocumentStore`]
//! abstraction every backend implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod change;
pub mod config;
pub mod document;
pub mod error;
pub mod merge;
pub mod source;
pub mod store;

pub use error::{Error, Result};
