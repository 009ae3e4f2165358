pub mod api;
pub mod args;
pub mod config;
pub mod dispatch;
mod error;
pub mod ledger;
pub mod model;
pub mod store;
mod utils;


pub use config::Config;
pub use error::Error;
pub use error::Result;
