// CLI layer - argument parsing and command handlers.

#[path = "args.rs"]
pub mod args;

#[path = "handlers.rs"]
pub mod handlers;

pub use args::Cli;
pub use handlers::App;
