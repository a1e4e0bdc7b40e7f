//! Flotilla Core - foundational types for the wave-based release deployer
//!
//! This crate provides the types shared by every other flotilla crate:
//! - `UniqName`: canonical `name@namespace` release identity
//! - `ReleaseConfig` / `Release`: two-phase release model (raw declaration,
//!   then validated and frozen)

pub mod error;
pub mod release;
pub mod uniqname;

pub use error::{CoreError, Result};
pub use release::{Chart, DEFAULT_TIMEOUT, PendingStrategy, Release, ReleaseConfig};
pub use uniqname::UniqName;
