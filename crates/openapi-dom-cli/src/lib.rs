pub mod cli;
pub mod collection;
pub mod commands;
pub mod config;
pub mod error;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use config::CliConfig;
pub use error::{CliError, CliResult};
pub use source::{load_source, Source, SourceFetcher};
pub use utils::{init_tracing, ColoredOutput};
