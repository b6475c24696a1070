pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use config::{cli::LocalStorage, toml_config::RatesConfig};
pub use core::etl::EtlEngine;
pub use utils::error::{RatesError, Result};
