//! FuelCheck API collaborator
//!
//! The coordinator only ever talks to the [`FuelApiClient`] trait; the
//! production HTTP implementation lives in `client.rs`, wire-format types in
//! `types.rs`. Tests substitute scripted implementations of the trait.

pub mod client;
pub mod types;

pub use client::{FuelApiClient, FuelCheckClient};
pub use types::ApiCredentials;
