//! Signal Core Library
//!
//! Shared types, validation, configuration, and database models for the
//! influencer signal backtesting bot.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod types;

pub use error::{Error, Result};
