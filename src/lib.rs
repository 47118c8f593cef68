//! # Bowser - FuelCheck Price Aggregation Engine
//!
//! A Rust implementation of a fuel-price dashboard backend: polls the
//! government FuelCheck API on a schedule, maintains per-station price
//! readings for the user's selected stations, and derives "cheapest nearby"
//! rankings for named locations such as Home and Work.
//!
//! ## Features
//!
//! - **Async-first**: concurrent per-request I/O on the Tokio runtime
//! - **Partial-failure tolerant**: one failed request never poisons a cycle,
//!   and a fully failed cycle never corrupts previously known good state
//! - **Deterministic rankings**: price-ascending with stable tie-breaks
//! - **Typed entities**: a fixed snapshot shape for the presentation layer
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `fuel`: Fuel types, regions, and station price records
//! - `api`: FuelCheck API client behind the `FuelApiClient` trait
//! - `store`: Latest-known price record store
//! - `groups`: Location group resolution
//! - `ranking`: Cheapest-station ranking engine
//! - `entity`: Entity states and snapshots for the presentation layer
//! - `coordinator`: Poll cycle orchestration

pub mod api;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod fuel;
pub mod groups;
pub mod logging;
pub mod ranking;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::PollCoordinator;
pub use error::{BowserError, Result};
