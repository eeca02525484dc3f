//! Craftify Core - Shared types library.
//!
//! This crate provides common types used across all Craftify components:
//! - `client` - Session, cart and catalog state for the marketplace API
//! - `cli` - Terminal front end built on the client stores
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no persistence. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, user identities,
//!   bearer credentials and money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
