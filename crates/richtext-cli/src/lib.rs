// richtext-cli library exports

pub mod app;
pub mod cli;
pub mod config;
pub mod file_manager;
pub mod records;

pub use app::App;
pub use cli::{Command, InputFormat, Invocation};
pub use config::Config;
