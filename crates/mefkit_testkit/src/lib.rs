//! # mefkit Testkit
//!
//! Test utilities for mefkit.
//!
//! This crate provides:
//! - Test fixtures and session helpers
//! - Property-based test generators using proptest
//! - A model-checking integration harness for write sequences
//!
//! ## Usage
//!
//! ```rust
//! use mefkit_core::WriteRequest;
//! use mefkit_testkit::prelude::*;
//!
//! with_temp_session(|writer| {
//!     let samples = scenarios::ramp(100, 0.5);
//!     writer
//!         .write(&WriteRequest::new("eeg", &samples, 0, 100.0))
//!         .unwrap();
//!     assert_eq!(writer.channels(), vec!["eeg"]);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
