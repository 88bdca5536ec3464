pub mod api;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod detector;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod services;
pub mod storage;
pub mod telegram;
pub mod templates;
pub mod validation;

pub use error::{Error, Result};
