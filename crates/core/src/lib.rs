//! Core types and configuration for the lotscout system.
//!
//! This crate provides shared types used across all other crates:
//! - Card, lot and auction types
//! - Reference tables (grades, currencies, set codes)
//! - The wide price-history table
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod history;
pub mod reference;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use history::PriceHistoryTable;
pub use reference::{CurrencyTable, GradeTable, SetCatalog};
pub use types::*;
