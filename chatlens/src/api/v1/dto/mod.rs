//! v1 API Data Transfer Objects.
//!
//! Request bodies and response payloads that are specific to the HTTP
//! surface. Domain types from `crate::models` are embedded directly where
//! their wire shape already fits.

pub mod analysis;
pub mod clustering;

pub use analysis::*;
pub use clustering::*;
