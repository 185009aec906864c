pub mod cli;
pub mod config;
mod db;
pub mod extract;
pub mod histogram;
pub mod kmeans;
mod metrics;
pub mod score;
mod server;
pub mod shape;
pub mod texture;
pub mod utils;
pub mod vsdb;

pub use config::Opts;
pub use vsdb::{VSDB, VSDBBuilder};
