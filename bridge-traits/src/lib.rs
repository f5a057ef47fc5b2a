//! # Host Bridge Traits
//!
//! Abstraction traits that must be implemented by each host or remote backend.
//!
//! ## Overview
//!
//! This crate defines the contract between the synchronization engine and the
//! outside world. Each trait represents a capability the engine requires but
//! that is implemented differently per host or per remote.
//!
//! ## Traits
//!
//! ### Remote
//! - [`HttpClient`](http::HttpClient) - Async HTTP, one attempt per call
//! - [`ObjectStore`](object_store::ObjectStore) - Content-addressed blobs, trees,
//!   commits and a conditionally-updated branch ref
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Implementations
//!
//! | Trait         | Implementation Crate | Backing            |
//! |---------------|----------------------|--------------------|
//! | `HttpClient`  | `bridge-desktop`     | `reqwest`          |
//! | `ObjectStore` | `provider-github`    | GitHub git data API |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! should:
//!
//! - Map remote statuses to the typed variants (`Unauthorized`, `NotFound`,
//!   `RateLimited`, `RemoteUnavailable`, `Conflict`)
//! - Provide actionable error messages
//! - Never include credentials in error text
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can serve the
//! parallel blob uploads of a transaction.

pub mod error;
pub mod http;
pub mod object_store;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use object_store::{
    AccessToken, BlobEncoding, EntryMode, ObjectId, ObjectKind, ObjectStore, TreeEntry, TreeItem,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
