//! Loyalty POS Core - shared types and rewards logic.
//!
//! This crate provides the domain model used by every Loyalty POS component:
//! - `server` - HTTP service for check-ins, purchases and merchant configuration
//! - `cli` - Command-line tools for migrations, seeding and offline tier checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs and purchase amounts
//! - [`rewards`] - Tier configuration, tier resolution, and ledger arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod rewards;
pub mod types;

pub use rewards::*;
pub use types::*;
