//! Core types and trait definitions for linkshelf.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the rules for a user's link collection and the store abstractions every
//! other crate builds on.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod editor;
pub mod error;
pub mod link;
pub mod links;
pub mod profile;
pub mod store;
pub mod subscription;
pub mod template;
pub mod user;

pub use error::{Error, ResolveError, Result, ValidationError};
