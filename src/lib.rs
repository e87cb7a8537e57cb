pub mod cli;
pub mod errors;
pub mod pg;
pub mod pgmeta;
pub mod server;

pub use errors::{Error, Result};
pub use server::{Config, ConfigDistributor, ConfigStore, Server, Session};
