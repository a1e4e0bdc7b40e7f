//! Flotilla Plan - plan file parsing and validation
//!
//! This crate turns a plan file into a validated `Plan`:
//! - strict YAML schema (unknown fields and duplicate keys rejected)
//! - release resolution with duplicate-identity detection
//! - repository and registry metadata validation
//! - tag-based filtering with dependency closure

pub mod error;
pub mod plan;
pub mod registry;
pub mod repository;

pub use error::{PlanError, Result};
pub use plan::{Plan, PlanBody};
pub use registry::Registry;
pub use repository::Repository;
