//! Menu Adequacy Engine Library
//!
//! Nutritional adequacy recalculation for school menu analysis, with the HTTP client and local
//! working-copy store around it.

pub mod build_info;
pub mod client;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
