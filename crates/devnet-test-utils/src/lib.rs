//! # devnet-test-utils
//!
//! Test doubles for the devnet workspace.
//!
//! [`MockEngine`] keeps networks, containers and exec instances in memory and
//! mimics the engine behaviours the lifecycle components rely on: duplicate
//! checks, refusal to remove networks with endpoints, label filtering and
//! blocking non-detached execs.

#![warn(missing_docs)]

pub mod engine;

pub use engine::{MockContainer, MockEngine, Operation};
