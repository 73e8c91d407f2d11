//! # devnet-common
//!
//! Shared types for the devnet workspace.
//!
//! This crate provides the pieces every other devnet crate agrees on:
//! - The error taxonomy (fatal vs. recoverable) and engine error classes
//! - Label selectors used to discover service containers
//! - Configuration for the engine connection, the dev network and services

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod labels;

pub use config::{ApiVersion, DevnetConfig, EngineConfig, NetworkSettings, ServiceSettings};
pub use error::{DevnetError, DevnetResult, EngineError, EngineResult};
pub use labels::LabelSelector;
