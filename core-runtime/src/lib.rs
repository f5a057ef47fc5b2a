//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the blog synchronization engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for transaction progress
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on. It
//! establishes the logging conventions, the validated engine configuration and
//! the event broadcasting mechanism used throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ContentLayout, EngineConfig, EngineConfigBuilder, RepositoryConfig};
pub use error::{Error, Result};
