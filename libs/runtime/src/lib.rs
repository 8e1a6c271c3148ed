//! Process plumbing shared by the binaries: layered configuration, logging,
//! home directory resolution and shutdown signalling.

pub mod config;
pub mod logging;
pub mod paths;
pub mod shutdown;

pub use config::{AppConfig, CliArgs, DatabaseConfig, LoggingConfig, Section, ServerConfig};
