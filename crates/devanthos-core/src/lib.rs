//! # devanthos-core
//!
//! Core crate for Devanthos. Contains the configuration schema and the
//! unified error system shared by the plugin engine, the scaffolding
//! workflow and the CLI.
//!
//! This crate has **no** internal dependencies on other Devanthos crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
