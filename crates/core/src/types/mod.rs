//! Core types for Craftify.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod id;
pub mod identity;
pub mod money;

pub use credential::Credential;
pub use id::*;
pub use identity::UserId;
pub use money::{format_price, line_total};
