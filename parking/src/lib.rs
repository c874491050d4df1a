pub mod config;
pub mod core;
pub mod domain;
pub mod models;
pub mod stream;
