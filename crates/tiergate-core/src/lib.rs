//! Core types and decision logic for the tiergate access gate.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! answers "what may this caller do" given a subscription record; verifying
//! who the caller is happens upstream.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod error;
pub mod gate;
pub mod identity;
pub mod lifecycle;
pub mod quota;
pub mod record;
pub mod role;
pub mod service;
pub mod store;
pub mod view;

pub use error::{Error, Result, ValidationError};
pub use identity::Identity;

#[cfg(test)]
mod test_support;
