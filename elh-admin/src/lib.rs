pub mod auth;
pub mod cli;
pub mod factory;
pub mod firestore;
pub mod load_config;
pub mod render;

pub use cli::{run, AppContext, Cli, Commands};
