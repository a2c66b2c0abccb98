//! Zeron: discovery, attack-surface construction, category-ordered exploitation,
//! validation, scoring and reporting for web applications.

pub mod analyzer;
pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod discovery;
pub mod errors;
pub mod exploit;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod reporting;
pub mod scoring;
pub mod surface;
pub mod utils;
pub mod validator;
