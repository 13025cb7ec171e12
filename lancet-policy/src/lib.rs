//! Capability allow-list registry and gatekeeper for the Lancet sandbox.
//!
//! Decides, for every capability a snippet tries to acquire, whether the
//! acquisition is fully approved, satisfied with an inert stub, or
//! denied. Unknown names are always denied.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod registry;
pub mod scan;

pub use error::PolicyError;
pub use registry::{AllowListRegistry, AllowRule, Classification, Decision, MatchRule};
pub use scan::{first_denied, scan_acquisitions};
