// src/lib.rs
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod features;
pub mod infrastructure;
pub mod logging;
pub mod middleware;
pub mod shared;
