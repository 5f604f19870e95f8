#![forbid(unsafe_code)]

pub mod agenda;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod persistence;
pub mod store;
pub mod stream;
pub mod worker;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
