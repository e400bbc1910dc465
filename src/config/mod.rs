#[cfg(feature = "cli")]
pub mod cli;
pub mod trainer;

#[cfg(feature = "cli")]
pub use cli::{Cli, Command};
pub use trainer::TrainerConfig;
