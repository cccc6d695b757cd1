//! # steward-api
//!
//! Thin client for the persistence API collaborator (projects, deployments,
//! incidents, allocations). The core never embeds storage logic — every call
//! goes through `get/post/patch/delete(path, payload) → json`, raising
//! [`RemoteError`] on non-success status.
//!
//! Retries are opt-in via [`with_retry`] and bounded by the caller's
//! [`steward_core::RetryConfig`]; the graph engine never retries on its own.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;

pub use client::{ApiClient, with_retry};
pub use errors::RemoteError;
