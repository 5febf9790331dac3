//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations.

pub mod sponsor_profile;

pub use sponsor_profile::{NewSponsorProfile, Replacement, SponsorProfileRepository};
