//! Core types shared across the backplane CLI.
//!
//! Currently this is the error taxonomy and the user-facing error formatting
//! used by the binary's entry point.

pub mod error;

pub use error::{BackplaneError, ErrorContext, user_friendly_error};
