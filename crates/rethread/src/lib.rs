#![forbid(unsafe_code)]

pub mod cli;
pub mod convert;
pub mod detect;
pub mod error;
pub mod extract;
pub mod gate;
pub mod models;
pub mod report;
pub mod server;
pub mod upload;
pub mod utils;

pub use cli::app::{Cli, Command};
pub use error::{ConvertError, Result};
