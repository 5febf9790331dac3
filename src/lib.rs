//! # Sponsor Profile Library
//!
//! Core of the Sponsor Profile service: configuration, persistence, upload
//! storage, HTTP handlers and server assembly.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod profile_service;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub mod uploads;
pub use migration;
