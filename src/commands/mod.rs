pub mod config;
mod get;
mod token;

pub use get::get;
pub use token::{token_import, token_refresh, token_show};
