//! Core types and trait definitions for the street-works relay.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! SQLite store, the notification verifier and the HTTP API all build on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod bbox;
pub mod error;
pub mod event;
pub mod promoter;
pub mod publisher;
pub mod query;
pub mod store;

pub use bbox::BBox;
pub use error::{Error, Result};
pub use event::Event;
