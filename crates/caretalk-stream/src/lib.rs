pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod token;

pub use backend::{ChatBackend, EnsuredChannel, MembershipOutcome};
pub use client::StreamClient;
pub use config::{Config, ConfigError};
pub use error::StreamError;
