//! Property advisor HTTP service

pub mod api;
pub mod config;
