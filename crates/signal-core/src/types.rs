//! Core domain types for the signal backtesting system.

pub mod outcome;
pub mod signal;
pub mod strategy;

pub use outcome::*;
pub use signal::*;
pub use strategy::*;
