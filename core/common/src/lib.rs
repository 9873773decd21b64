//! Common utilities and types shared across orgshare crates.
//!
//! This module provides the error taxonomy used by every Google-facing
//! component, along with the small value types the CLI and services share.

pub mod error;
pub mod types;

pub use error::{Error, RefreshError, Result, Service};
pub use types::{Organization, Secret};
