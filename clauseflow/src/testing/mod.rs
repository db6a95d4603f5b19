//! Test doubles for the generation boundary.
//!
//! Shipped as a regular module so downstream crates can drive a pipeline
//! without a live generation service.

mod mocks;

pub use mocks::{FailingGenerator, MockGenerator};
