//! # GitHub Provider
//!
//! Implements the `ObjectStore` trait for the GitHub REST v3 git database API.
//!
//! ## Overview
//!
//! This crate provides:
//! - Blob, tree and commit creation (`POST /git/blobs|trees|commits`)
//! - Branch head, commit and recursive tree reads
//! - Conditional branch advance (re-read + `force: false` fast-forward)
//! - Status classification into the typed `BridgeError` variants, including
//!   primary and secondary rate limits with a retry-after hint

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GitHubObjectStore;
pub use error::{GitHubError, Result};
