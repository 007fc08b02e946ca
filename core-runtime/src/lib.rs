//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the streaming core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration types
//! (`StripeLayout`, `CipherPreference`, `AudioQuality`), logging conventions
//! and event broadcasting.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AudioQuality, CipherPreference, CoreConfig, StripeLayout};
pub use error::{Error, Result};
