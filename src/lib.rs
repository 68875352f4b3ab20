//! Nutricalc Library
//!
//! Recipe nutrition from a per-100g reference table: scaling, aggregation,
//! per-nutrient rounding and derived vitamin and fatty-acid values.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
