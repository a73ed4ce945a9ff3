//! pinkeep - pin-on-access cache manager for IPFS content
//!
//! Pins content-addressed resources the first time an application fetches
//! them, keeps exactly one pinned resource per namespace (e.g. the current
//! client release of a network), and unpins resources that have not been
//! accessed within a configurable window.

pub mod access;
pub mod audit;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod intercept;
pub mod ledger;
pub mod namespace;
pub mod pin;
pub mod reaper;
pub mod service;
pub mod ui;

#[cfg(test)]
mod testing;

pub use error::{PinkeepError, PinkeepResult};
pub use service::PinKeeper;
