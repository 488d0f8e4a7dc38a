//! Configuration management for `ocm-backplane`.
//!
//! All configuration lives in one global TOML file, see [`GlobalConfig`]
//! for its location and format. Settings are loaded once at startup and
//! passed down explicitly; nothing reads configuration from global state.

mod global;

pub use global::{CONFIG_ENV_VAR, GlobalConfig};
