//! # Cardstream Core
//!
//! Wire-level building blocks for the Cardstream payment gateway protocol.
//!
//! - [`fields`]: insertion-ordered field maps and their form encoding
//! - [`signature`]: SHA-512 message signing and constant-time verification
//! - [`codes`]: response code classification
//! - [`amount`]: conversion between decimal totals and minor units
//! - [`integration`]: the supported integration types
//!
//! Higher level concerns (configuration, HTTP transport, response
//! interpretation) live in `cardstream-kit`.

pub mod amount;
pub mod codes;
pub mod errors;
pub mod fields;
pub mod integration;
pub mod signature;

pub use errors::{Error, Result};
pub use fields::{FieldValue, Fields};
