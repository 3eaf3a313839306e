//! Patrimoine - possession register and portfolio valuation
//!
//! This library keeps a register of dated possessions (value, holding window,
//! annual depreciation rate) and values the whole portfolio at a date or over
//! a date range.

pub mod config;
pub mod db;
pub mod error;
pub mod importers;
pub mod remote;
pub mod utils;
pub mod valuation;
