pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod operator;
pub mod scripts;
pub mod security;
pub mod ssh;
pub mod target;
pub mod utils;
pub mod workflow;

pub use cli::Cli;
pub use config::{GeneratedConfig, Product};
pub use operator::{Operator, OperatorError};
pub use target::Target;
