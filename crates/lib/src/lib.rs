//! # Device configuration build tooling
//!
//! Build-time tools for the device configuration pipeline: converting
//! source proto config bundles to platform JSON, packing the ConfigFS
//! identity blob and image, and generating metrics event classes.

pub mod cli;
pub mod config;
pub mod configfs;
pub mod events;
pub mod identity;
pub mod proto;
